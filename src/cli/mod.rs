pub mod parser;

use crate::commands::CommandExecutor;
use crate::result::Result;
use clap::Parser;

#[derive(Parser)]
#[command(name = "xcforge")]
#[command(about = "Build CocoaPods dependencies into merged xcframeworks")]
#[command(version = "0.1.0")]
#[command(arg_required_else_help = true)]
#[command(
    help_template = "{before-help}{name} v{version}\n\n{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
pub enum Commands {
    #[command(about = "Build every target and stage the xcframeworks")]
    Build {
        #[arg(short, long, help = "Build manifest (default: xcforge.toml)")]
        config: Option<String>,

        #[arg(long, help = "Build configuration, e.g. Debug or Release")]
        configuration: Option<String>,

        #[arg(long, help = "Skip dSYM generation and collection")]
        no_dsym: bool,

        #[arg(long, help = "Destination folder name next to the sandbox")]
        destination: Option<String>,

        #[arg(short, long, help = "Stream xcodebuild output")]
        verbose: bool,
    },

    #[command(about = "Show the slices and merges a build would run")]
    Plan {
        #[arg(short, long, help = "Build manifest (default: xcforge.toml)")]
        config: Option<String>,
    },

    #[command(about = "Create a default xcforge.toml")]
    Init {
        #[arg(long, help = "Force overwrite existing xcforge.toml")]
        force: bool,
    },
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let mut executor = CommandExecutor::new();

        match self.command {
            Commands::Build {
                config,
                configuration,
                no_dsym,
                destination,
                verbose,
            } => {
                executor
                    .build_project(config, configuration, no_dsym, destination, verbose)
                    .await
            }
            Commands::Plan { config } => executor.plan_project(config).await,
            Commands::Init { force } => executor.init_project(force).await,
        }
    }
}
