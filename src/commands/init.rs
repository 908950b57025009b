use crate::build::{BuildManifest, DEFAULT_MANIFEST};
use crate::result::{ForgeError, Result};
use std::path::Path;

pub async fn execute(force: bool) -> Result<()> {
    let mut cmd = InitCommand::new();
    cmd.execute(Path::new(DEFAULT_MANIFEST), force).await
}

#[derive(Default)]
pub struct InitCommand;

impl InitCommand {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&mut self, manifest_path: &Path, force: bool) -> Result<()> {
        log::info!("Starting init with force: {}", force);

        if manifest_path.exists() && !force {
            log::warn!("{} already exists, init aborted", manifest_path.display());
            return Err(ForgeError::Config(
                format!(
                    "{} already exists. Use --force to overwrite.",
                    manifest_path.display()
                )
                .into(),
            ));
        }

        BuildManifest::default().save_to_file(manifest_path).await?;

        println!("{} created successfully!", manifest_path.display());
        println!();
        println!("Please edit it to match your project:");
        println!("   - Point sandbox_root and project at your Pods directory");
        println!("   - List each umbrella target with its platform");
        println!("   - List the modules each target builds");
        println!();
        println!("Then run: xcforge build");

        log::info!("Init completed successfully");

        Ok(())
    }
}
