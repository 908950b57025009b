use crate::build::{ModuleSpec, TargetSpec};
use crate::result::{ForgeError, Result};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const DEFAULT_MANIFEST: &str = "xcforge.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    pub build: Build,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    /// Dependency sandbox; its parent is the root of `build/`, `Frameworks/` and `dSYM/`.
    pub sandbox_root: PathBuf,
    /// Generated project; defaults to `<sandbox_root>/Pods.xcodeproj`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<PathBuf>,
    #[serde(default = "default_configuration")]
    pub configuration: String,
    #[serde(default = "default_true")]
    pub debug_symbols: bool,
    #[serde(default = "default_destination")]
    pub destination: String,
    #[serde(default)]
    pub prune_dynamic_slices: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_build: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_build: Option<String>,
}

fn default_configuration() -> String {
    "Debug".to_string()
}

fn default_destination() -> String {
    "Frameworks".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for BuildManifest {
    fn default() -> Self {
        Self {
            build: Build {
                sandbox_root: "Pods".into(),
                project: Some("Pods/Pods.xcodeproj".into()),
                configuration: default_configuration(),
                debug_symbols: true,
                destination: default_destination(),
                prune_dynamic_slices: false,
                pre_build: None,
                post_build: None,
            },
            targets: vec![TargetSpec {
                label: "Pods-App".into(),
                platform: "ios".into(),
                deployment_target: Some("12.0".to_string()),
                modules: vec![ModuleSpec::new("Alamofire", "Alamofire")],
            }],
        }
    }
}

impl BuildManifest {
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let manifest: BuildManifest = toml::from_str(content).map_err(|e| {
            ForgeError::Config(format!("Invalid build manifest format: {}", e).into())
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ForgeError::Config(format!("Failed to serialize build manifest: {}", e).into())
        })?;

        fs::write(path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.build.sandbox_root.as_os_str().is_empty() {
            return Err(ForgeError::config("Sandbox root cannot be empty"));
        }

        if self.build.configuration.is_empty() {
            return Err(ForgeError::config("Configuration cannot be empty"));
        }

        if self.build.destination.is_empty() {
            return Err(ForgeError::config("Destination cannot be empty"));
        }

        for target in &self.targets {
            if target.label.is_empty() {
                return Err(ForgeError::config("Target label cannot be empty"));
            }
            for module in &target.modules {
                if module.root.is_empty() || module.binary_id().is_empty() {
                    return Err(ForgeError::config(format!(
                        "Module identifiers cannot be empty in target {}",
                        target.label
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn project_path(&self) -> PathBuf {
        self.build
            .project
            .clone()
            .unwrap_or_else(|| self.build.sandbox_root.join("Pods.xcodeproj"))
    }
}

/// Options and directory layout for one orchestration run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub configuration: SmolStr,
    pub debug_symbols: bool,
    pub prune_dynamic_slices: bool,
    pub sandbox_root: PathBuf,
    pub project: PathBuf,
    pub build_dir: PathBuf,
    pub destination: PathBuf,
    pub dsym_dir: PathBuf,
}

impl RunOptions {
    /// Lays out `build/`, the destination and `dSYM/` next to the sandbox.
    pub fn new(sandbox_root: impl Into<PathBuf>, project: impl Into<PathBuf>) -> Self {
        let sandbox_root = sandbox_root.into();
        let root = sandbox_root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self {
            configuration: "Debug".into(),
            debug_symbols: true,
            prune_dynamic_slices: false,
            project: project.into(),
            build_dir: root.join("build"),
            destination: root.join(default_destination()),
            dsym_dir: root.join("dSYM"),
            sandbox_root,
        }
    }

    pub fn from_manifest(manifest: &BuildManifest, base: &Path) -> Self {
        let mut options = Self::new(
            base.join(&manifest.build.sandbox_root),
            base.join(manifest.project_path()),
        );
        options.configuration = manifest.build.configuration.as_str().into();
        options.debug_symbols = manifest.build.debug_symbols;
        options.prune_dynamic_slices = manifest.build.prune_dynamic_slices;
        options.set_destination_name(&manifest.build.destination);
        options
    }

    pub fn set_destination_name(&mut self, name: &str) {
        let root = self
            .sandbox_root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.destination = root.join(name);
    }

    /// Root directory of a module's sources inside the sandbox.
    pub fn pod_dir(&self, root: &str) -> PathBuf {
        self.sandbox_root.join(root)
    }

    /// Public headers published by the dependency sandbox for a module.
    pub fn public_headers_dir(&self, binary_id: &str) -> PathBuf {
        self.sandbox_root
            .join("Headers")
            .join("Public")
            .join(binary_id)
    }
}
