use crate::build::DEFAULT_MANIFEST;
use crate::result::{ForgeError, Result};
use std::path::PathBuf;

pub struct CliParser;

impl CliParser {
    /// Resolves the manifest path, defaulting to `xcforge.toml`.
    pub fn validate_manifest_path(path: Option<&str>) -> Result<PathBuf> {
        let manifest = PathBuf::from(path.unwrap_or(DEFAULT_MANIFEST));

        if !manifest.exists() {
            return Err(ForgeError::NotFound(
                format!(
                    "Manifest '{}' not found. Run 'xcforge init' to create it.",
                    manifest.display()
                )
                .into(),
            ));
        }

        if !manifest.is_file() {
            return Err(ForgeError::Config("Manifest path is not a file".into()));
        }

        Ok(manifest)
    }

    pub fn validate_configuration(name: &str) -> Result<&str> {
        if name.trim().is_empty() || name.contains(char::is_whitespace) {
            return Err(ForgeError::config(format!(
                "Invalid configuration name: '{}'",
                name
            )));
        }
        Ok(name)
    }
}
