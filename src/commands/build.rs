use crate::build::{BuildManifest, RunOptions};
use crate::cli::parser::CliParser;
use crate::orchestrator::{BuildOrchestrator, BuildReport, Hook, HookFuture, RunContext};
use crate::result::{ForgeError, Result};
use crate::toolchain::XcodeProjectSettings;
use crate::utils::process::{CommandRunner, Invocation, ProcessRunner};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub struct BuildArgs<'a> {
    pub config: Option<&'a str>,
    pub configuration: Option<&'a str>,
    pub no_dsym: bool,
    pub destination: Option<&'a str>,
    pub verbose: bool,
}

pub async fn execute(args: BuildArgs<'_>) -> Result<()> {
    let mut cmd = BuildCommand::new();
    cmd.execute(args).await
}

#[derive(Default)]
pub struct BuildCommand;

impl BuildCommand {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&mut self, args: BuildArgs<'_>) -> Result<()> {
        let manifest_path = CliParser::validate_manifest_path(args.config)?;
        let manifest = BuildManifest::from_file(&manifest_path).await?;
        let base = manifest_base_dir(&manifest_path)?;
        let options = self.run_options(&manifest, &base, &args)?;

        let toolchain = ProcessRunner::find_executable("xcodebuild")
            .map_err(|_| ForgeError::not_found(ForgeError::XCODEBUILD_NOT_FOUND))?;

        log::info!(
            "Starting build of {} targets ({}) from {}",
            manifest.targets.len(),
            options.configuration,
            manifest_path.display()
        );

        if args.verbose {
            println!("Build configuration:");
            println!("  Project: {}", options.project.display());
            println!("  Configuration: {}", options.configuration);
            println!("  Destination: {}", options.destination.display());
            println!("  dSYMs: {}", options.debug_symbols);
            println!("  Toolchain: {}", toolchain.display());
        }

        let spinner = if args.verbose {
            ProgressBar::hidden()
        } else {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .map_err(|e| ForgeError::config(format!("Invalid progress template: {}", e)))?,
            );
            spinner.enable_steady_tick(std::time::Duration::from_millis(100));
            spinner
        };

        let toolchain = toolchain.to_string_lossy().into_owned();
        let settings =
            XcodeProjectSettings::new(ProcessRunner::new(args.verbose), options.project.clone())
                .with_program(toolchain.clone());
        let mut orchestrator =
            BuildOrchestrator::new(ProcessRunner::new(args.verbose), settings, options)
                .with_toolchain(toolchain)
                .with_progress(spinner.clone());

        if let Some(command) = &manifest.build.pre_build {
            orchestrator =
                orchestrator.with_pre_build_hook(shell_hook("pre_build", command, &base, args.verbose));
        }
        if let Some(command) = &manifest.build.post_build {
            orchestrator =
                orchestrator.with_post_build_hook(shell_hook("post_build", command, &base, args.verbose));
        }

        let started = Instant::now();
        let result = orchestrator.run(&manifest.targets).await;
        spinner.finish_and_clear();

        match result {
            Ok(report) => {
                print_report(&report, orchestrator.options(), started.elapsed());
                log::info!(
                    "Build completed: {} xcframeworks, {} staged entries",
                    report.merged.len(),
                    report.staged.len()
                );
                Ok(())
            }
            Err(e) => {
                log::error!("Build failed: {}", e);
                Err(e)
            }
        }
    }

    fn run_options(
        &self,
        manifest: &BuildManifest,
        base: &Path,
        args: &BuildArgs<'_>,
    ) -> Result<RunOptions> {
        let mut options = RunOptions::from_manifest(manifest, base);

        if let Some(configuration) = args.configuration {
            options.configuration = CliParser::validate_configuration(configuration)?.into();
        }
        if args.no_dsym {
            options.debug_symbols = false;
        }
        if let Some(destination) = args.destination {
            options.set_destination_name(destination);
        }

        Ok(options)
    }
}

fn manifest_base_dir(manifest_path: &Path) -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        ForgeError::Process(format!("Failed to get current directory: {}", e).into())
    })?;

    Ok(manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| current_dir.join(p))
        .unwrap_or(current_dir))
}

/// A hook that runs `command` through `sh -c` from the manifest directory.
///
/// The run's layout is exported as `XCFORGE_*` environment variables.
pub fn shell_hook(name: &'static str, command: &str, base: &Path, verbose: bool) -> Hook {
    let command = command.to_string();
    let base = base.to_path_buf();
    let runner = ProcessRunner::new(verbose);

    Box::new(move |ctx: &RunContext<'_>| -> HookFuture {
        let path = |p: &Path| p.to_string_lossy().into_owned();
        let invocation = Invocation::new("sh")
            .arg("-c")
            .arg(command.as_str())
            .current_dir(base.clone())
            .env("XCFORGE_CONFIGURATION", ctx.options.configuration.as_str())
            .env("XCFORGE_SANDBOX_ROOT", path(&ctx.options.sandbox_root))
            .env("XCFORGE_BUILD_DIR", path(&ctx.options.build_dir))
            .env("XCFORGE_DESTINATION", path(&ctx.options.destination))
            .env("XCFORGE_TARGETS", ctx.targets.len().to_string());
        let runner = runner.clone();

        Box::pin(async move {
            log::info!("Running {} hook: {}", name, invocation);

            let output = runner.run(&invocation).await.map_err(|e| {
                ForgeError::hook(format!("Failed to start {} hook: {}", name, e))
            })?;
            if output.is_success() {
                return Ok(());
            }

            let stderr = output.stderr.trim();
            if !stderr.is_empty() {
                log::error!("{} hook stderr: {}", name, stderr);
            }
            Err(ForgeError::hook(format!(
                "{} hook exited with code: {}",
                name,
                output.code.unwrap_or(-1)
            )))
        })
    })
}

fn print_report(report: &BuildReport, options: &RunOptions, elapsed: std::time::Duration) {
    let built = report
        .merged
        .iter()
        .filter(|m| m.outcome.output.is_some())
        .count();
    println!(
        "Built {} xcframeworks ({} static, {} dynamic)",
        built, report.static_modules, report.dynamic_modules
    );

    for module in report.partial() {
        println!(
            "  warning: {} built from {} of {} slices",
            module.binary, module.outcome.inputs, module.outcome.expected
        );
    }

    if !report.macos_products.is_empty() {
        println!("Built {} macOS products", report.macos_products.len());
    }

    println!(
        "Copied {} entries to {}",
        report.staged.len(),
        options.destination.display()
    );

    if options.debug_symbols {
        println!(
            "Collected {} dSYMs into {}",
            report.dsyms.len(),
            options.dsym_dir.display()
        );
    }

    println!("Build successful ({})", format_duration(elapsed));
}

fn format_duration(duration: std::time::Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms >= 1000 {
        let seconds = duration.as_secs_f64();
        format!("{:.2}s", seconds)
    } else {
        format!("{}ms", total_ms)
    }
}
