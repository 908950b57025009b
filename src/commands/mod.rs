pub mod build;
pub mod init;
pub mod plan;

use crate::result::Result;
use smol_str::SmolStr;

#[derive(Debug)]
pub enum CommandType {
    Build {
        config: Option<SmolStr>,
        configuration: Option<SmolStr>,
        no_dsym: bool,
        destination: Option<SmolStr>,
        verbose: bool,
    },
    Plan {
        config: Option<SmolStr>,
    },
    Init {
        force: bool,
    },
}

impl CommandType {
    pub async fn execute(self) -> Result<()> {
        match self {
            CommandType::Build {
                config,
                configuration,
                no_dsym,
                destination,
                verbose,
            } => {
                build::execute(build::BuildArgs {
                    config: config.as_deref(),
                    configuration: configuration.as_deref(),
                    no_dsym,
                    destination: destination.as_deref(),
                    verbose,
                })
                .await
            }
            CommandType::Plan { config } => plan::execute(config.as_deref()).await,
            CommandType::Init { force } => init::execute(force).await,
        }
    }
}

#[derive(Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }

    pub async fn build_project(
        &mut self,
        config: Option<String>,
        configuration: Option<String>,
        no_dsym: bool,
        destination: Option<String>,
        verbose: bool,
    ) -> Result<()> {
        CommandType::Build {
            config: config.map(|s| s.into()),
            configuration: configuration.map(|s| s.into()),
            no_dsym,
            destination: destination.map(|s| s.into()),
            verbose,
        }
        .execute()
        .await
    }

    pub async fn plan_project(&mut self, config: Option<String>) -> Result<()> {
        CommandType::Plan {
            config: config.map(|s| s.into()),
        }
        .execute()
        .await
    }

    pub async fn init_project(&mut self, force: bool) -> Result<()> {
        CommandType::Init { force }.execute().await
    }
}
