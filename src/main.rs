use clap::Parser;
use dirs::config_dir;
use env_logger::Builder;
use log::LevelFilter;
use std::fs::{File, OpenOptions};
use xcforge::cli::Cli;
use xcforge::result::Result;

/** Main entry point for xcforge
 *
 * # Process Flow
 * 1. Initialize logging with file output
 * 2. Parse command line arguments using Clap
 * 3. Execute the requested command
 * 4. Exit non-zero with the failing stage on any fatal error
 *
 * # Example
 * ```bash
 * xcforge init
 * xcforge plan
 * xcforge build --configuration Release
 * ```
 */
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(e.exit_code());
        }
    };

    cli.execute().await
}

/** Initializes the logging system with file-based output
 *
 * # Configuration
 * - Log file location: platform-specific config directory
 * - Log level: Info and above unless `RUST_LOG` says otherwise
 * - Output: Append mode to preserve historical logs
 *
 * # Directory Structure
 * - Linux: `~/.config/xcforge/xcforge.log`
 * - macOS: `~/Library/Application Support/xcforge/xcforge.log`
 */
fn init_logging() {
    let log_file = get_log_file_path();

    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let target = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .or_else(|_| File::create(&log_file));

    let mut builder = Builder::new();
    builder.filter_level(LevelFilter::Info).parse_default_env();
    match target {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        // Without a writable log file, warnings still reach stderr.
        Err(_) => {
            builder.filter_level(LevelFilter::Warn);
        }
    }
    builder.init();

    log::info!("xcforge started");
}

fn get_log_file_path() -> std::path::PathBuf {
    if let Some(config_dir) = config_dir() {
        config_dir.join("xcforge").join("xcforge.log")
    } else {
        std::env::current_dir()
            .map(|p| p.join("xcforge.log"))
            .unwrap_or_else(|_| "xcforge.log".into())
    }
}
