use crate::build::Sdk;
use crate::result::Result;
use crate::toolchain::SimulatorCatalog;
use crate::utils::process::{CommandRunner, Invocation};
use std::path::PathBuf;

pub const CATALYST_DESTINATION: &str = "platform=macOS,variant=Mac Catalyst";
pub const CATALYST_ARCHS: &str = "x86_64";

/** Drives `xcodebuild` for one slice at a time
 *
 * Every invocation pins `SYMROOT` to the build root so products land where
 * [`crate::artifact`] expects them. A non-zero exit is returned as an error
 * and is never retried.
 */
pub struct ToolchainInvoker<'a, R: CommandRunner> {
    runner: &'a R,
    program: String,
    project: PathBuf,
    build_root: PathBuf,
    xcconfig: Option<PathBuf>,
    catalog: SimulatorCatalog,
}

impl<'a, R: CommandRunner> ToolchainInvoker<'a, R> {
    pub fn new(runner: &'a R, project: impl Into<PathBuf>, build_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            program: "xcodebuild".to_string(),
            project: project.into(),
            build_root: build_root.into(),
            xcconfig: None,
            catalog: SimulatorCatalog::new(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_xcconfig(mut self, xcconfig: Option<PathBuf>) -> Self {
        self.xcconfig = xcconfig;
        self
    }

    fn base(&self, label: &str, configuration: &str) -> Invocation {
        let mut inv = Invocation::new(self.program.clone())
            .arg("-project")
            .path_arg(&self.project)
            .args(["-scheme", label, "-configuration", configuration]);
        if let Some(xcconfig) = &self.xcconfig {
            inv = inv.arg("-xcconfig").path_arg(xcconfig);
        }
        inv
    }

    fn symroot(&self) -> String {
        format!("SYMROOT={}", self.build_root.display())
    }

    /// Builds one device or simulator slice.
    pub async fn build_slice(
        &self,
        label: &str,
        sdk: Sdk,
        deployment_target: Option<&str>,
        configuration: &str,
    ) -> Result<()> {
        let destination = self
            .catalog
            .destination_args(self.runner, sdk, deployment_target)
            .await?;

        let inv = self
            .base(label, configuration)
            .args(["-sdk", sdk.as_str()])
            .args(destination)
            .arg(self.symroot());

        log::info!("Building {} for {} ({})", label, sdk, configuration);
        self.runner.run_checked(&inv).await?;
        Ok(())
    }

    /// Builds the Mac Catalyst slice, x86_64 only.
    pub async fn build_catalyst_slice(&self, label: &str, configuration: &str) -> Result<()> {
        let inv = self
            .base(label, configuration)
            .args(["-destination", CATALYST_DESTINATION])
            .arg(format!("ARCHS={}", CATALYST_ARCHS))
            .arg(self.symroot());

        log::info!("Building {} for Mac Catalyst ({})", label, configuration);
        self.runner.run_checked(&inv).await?;
        Ok(())
    }

    /// Builds a macOS target directly; its products are not merged.
    pub async fn build_macos(&self, label: &str, configuration: &str) -> Result<()> {
        self.build_slice(label, Sdk::MacOsx, None, configuration)
            .await
    }
}
