//! The build pipeline: configure, build every slice, merge, stage, clean up.

use crate::artifact;
use crate::build::{
    resolve_targets, Linkage, Module, Platform, RunOptions, Sdk, TargetSpec, UmbrellaTarget,
};
use crate::merge::{MergeOutcome, SliceMerger};
use crate::result::{ForgeError, Result};
use crate::symbols;
use crate::toolchain::{LinkageTable, ProjectSettings, ToolchainInvoker};
use crate::utils::fs::{copy_into, remove_dir_if_exists};
use crate::utils::process::CommandRunner;
use indicatif::ProgressBar;
use smol_str::SmolStr;
use std::collections::BTreeSet;
use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

/// What hooks get to see of a run.
pub struct RunContext<'a> {
    pub options: &'a RunOptions,
    pub targets: &'a [UmbrellaTarget],
}

pub type HookFuture = Pin<Box<dyn Future<Output = Result<()>>>>;

/// A callback run before or after the pipeline. It reads what it needs from
/// the context up front; the returned future must not borrow it.
pub type Hook = Box<dyn Fn(&RunContext<'_>) -> HookFuture>;

#[derive(Debug, Clone)]
pub struct MergedModule {
    pub binary: SmolStr,
    pub linkage: Linkage,
    pub outcome: MergeOutcome,
}

/// Summary of a successful run.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub merged: Vec<MergedModule>,
    pub macos_products: Vec<PathBuf>,
    pub staged: Vec<PathBuf>,
    pub dsyms: Vec<PathBuf>,
    /// Distinct merged binaries per linkage, however many targets share them.
    pub static_modules: usize,
    pub dynamic_modules: usize,
}

impl BuildReport {
    fn count_linkages(&mut self) {
        let mut seen = BTreeSet::new();
        let (mut statics, mut dynamics) = (0, 0);
        for module in &self.merged {
            if !seen.insert(module.binary.as_str()) {
                continue;
            }
            match module.linkage {
                Linkage::Static => statics += 1,
                Linkage::Dynamic => dynamics += 1,
            }
        }
        self.static_modules = statics;
        self.dynamic_modules = dynamics;
    }

    /// Modules whose artifact was built from fewer slices than expected.
    pub fn partial(&self) -> impl Iterator<Item = &MergedModule> {
        self.merged.iter().filter(|m| m.outcome.is_partial())
    }
}

/// A target as it would be built, without touching the toolchain.
#[derive(Debug, Clone)]
pub struct PlannedTarget {
    pub label: SmolStr,
    pub platform: Platform,
    pub sdks: Vec<Sdk>,
    pub modules: Vec<SmolStr>,
    pub merges: bool,
}

/// Resolves targets into the slices and merges a run would perform.
pub fn plan(targets: &[TargetSpec]) -> Result<Vec<PlannedTarget>> {
    resolve_targets(targets).map(|resolved| {
        resolved
            .into_iter()
            .map(|t| PlannedTarget {
                sdks: t.platform.built_sdks(),
                merges: t.platform.slice_sdks().is_some(),
                modules: t
                    .unique_modules()
                    .iter()
                    .map(|m| SmolStr::from(m.binary_id()))
                    .collect(),
                label: t.label,
                platform: t.platform,
            })
            .collect()
    })
}

pub struct BuildOrchestrator<R: CommandRunner, P: ProjectSettings> {
    runner: R,
    project: P,
    options: RunOptions,
    toolchain: String,
    pre_build: Option<Hook>,
    post_build: Option<Hook>,
    progress: ProgressBar,
}

impl<R: CommandRunner, P: ProjectSettings> BuildOrchestrator<R, P> {
    pub fn new(runner: R, project: P, options: RunOptions) -> Self {
        Self {
            runner,
            project,
            options,
            toolchain: "xcodebuild".to_string(),
            pre_build: None,
            post_build: None,
            progress: ProgressBar::hidden(),
        }
    }

    /// Path or name of the `xcodebuild` executable.
    pub fn with_toolchain(mut self, toolchain: impl Into<String>) -> Self {
        self.toolchain = toolchain.into();
        self
    }

    pub fn with_pre_build_hook(mut self, hook: Hook) -> Self {
        self.pre_build = Some(hook);
        self
    }

    pub fn with_post_build_hook(mut self, hook: Hook) -> Self {
        self.post_build = Some(hook);
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /** Runs the whole pipeline once
     *
     * Any failure aborts immediately with the failing stage attached. The
     * intermediate tree is only removed by the final clean step, so a failed
     * run leaves it in place, and the destination is not touched before the
     * stage step.
     */
    pub async fn run(&mut self, targets: &[TargetSpec]) -> Result<BuildReport> {
        let targets = resolve_targets(targets).map_err(|e| e.at_stage("plan"))?;
        let mut report = BuildReport::default();

        self.run_hook(&self.pre_build, &targets)
            .await
            .map_err(|e| e.at_stage("pre-build hook"))?;

        self.progress.set_message("Reading project build settings...");
        let (linkage, xcconfig) = self
            .configure()
            .await
            .map_err(|e| e.at_stage("configure"))?;

        remove_dir_if_exists(&self.options.build_dir).map_err(|e| e.at_stage("clean"))?;

        for target in &targets {
            let modules: Vec<Module> = target
                .unique_modules()
                .into_iter()
                .map(|spec| spec.with_linkage(linkage.for_module(&spec.root)))
                .collect();
            self.build_target(target, &modules, xcconfig.clone(), &mut report)
                .await
                .map_err(|e| e.at_stage("build"))?;
        }
        report.count_linkages();

        if !self.options.build_dir.is_dir() {
            return Err(
                ForgeError::integrity(ForgeError::BUILD_TREE_NOT_FOUND).at_stage("verify")
            );
        }

        self.progress.set_message("Staging artifacts...");
        report.staged = self
            .stage(&targets, &report)
            .map_err(|e| e.at_stage("stage"))?;

        if self.options.debug_symbols {
            self.progress.set_message("Collecting dSYMs...");
            let sdks: BTreeSet<Sdk> = targets
                .iter()
                .flat_map(|t| t.platform.built_sdks())
                .collect();
            let sdks: Vec<Sdk> = sdks.into_iter().collect();
            report.dsyms = symbols::collect(
                &self.options.dsym_dir,
                &self.options.build_dir,
                &self.options.configuration,
                &sdks,
            )
            .map_err(|e| e.at_stage("symbols"))?;
        }

        remove_dir_if_exists(&self.options.build_dir).map_err(|e| e.at_stage("final clean"))?;

        self.run_hook(&self.post_build, &targets)
            .await
            .map_err(|e| e.at_stage("post-build hook"))?;

        Ok(report)
    }

    async fn run_hook(&self, hook: &Option<Hook>, targets: &[UmbrellaTarget]) -> Result<()> {
        match hook {
            Some(hook) => {
                hook(&RunContext {
                    options: &self.options,
                    targets,
                })
                .await
            }
            None => Ok(()),
        }
    }

    async fn configure(&mut self) -> Result<(LinkageTable, Option<PathBuf>)> {
        let linkage = self.project.classify(&self.options.configuration).await?;

        let xcconfig = if self.options.debug_symbols {
            self.project
                .enable_debug_information(&self.options.configuration);
            self.project.save().await?
        } else {
            None
        };

        Ok((linkage, xcconfig))
    }

    async fn build_target(
        &self,
        target: &UmbrellaTarget,
        modules: &[Module],
        xcconfig: Option<PathBuf>,
        report: &mut BuildReport,
    ) -> Result<()> {
        let configuration = self.options.configuration.as_str();
        let invoker =
            ToolchainInvoker::new(&self.runner, &self.options.project, &self.options.build_dir)
                .with_program(self.toolchain.clone())
                .with_xcconfig(xcconfig);

        let (device, simulator) = match target.platform.slice_sdks() {
            Some(sdks) => sdks,
            None => {
                self.progress
                    .set_message(format!("Building {} for macOS...", target.label));
                invoker.build_macos(&target.label, configuration).await?;
                for module in modules {
                    let product = artifact::slice_path(
                        &self.options.build_dir,
                        configuration,
                        Sdk::MacOsx,
                        &module.root,
                        &module.binary,
                        module.linkage,
                    );
                    if product.exists() {
                        report.macos_products.push(product);
                    } else {
                        log::warn!("macOS product missing: {}", product.display());
                    }
                }
                return Ok(());
            }
        };

        let deployment_target = target.deployment_target.as_deref();
        for sdk in [device, simulator] {
            self.progress
                .set_message(format!("Building {} for {}...", target.label, sdk));
            invoker
                .build_slice(&target.label, sdk, deployment_target, configuration)
                .await?;
        }
        self.progress
            .set_message(format!("Building {} for Mac Catalyst...", target.label));
        invoker
            .build_catalyst_slice(&target.label, configuration)
            .await?;

        let merger = SliceMerger::new(&self.runner)
            .with_program(self.toolchain.clone())
            .prune_dynamic_slices(self.options.prune_dynamic_slices);
        let sdks = [device, simulator, Sdk::MacCatalyst];

        for module in modules {
            self.progress
                .set_message(format!("Creating {}.xcframework...", module.binary));
            let outcome = merger
                .merge_module(
                    module,
                    &sdks,
                    &self.options.build_dir,
                    configuration,
                    &self.options.public_headers_dir(&module.binary),
                )
                .await?;

            if outcome.is_partial() {
                log::warn!(
                    "{} merged from {} of {} slices",
                    module.binary,
                    outcome.inputs,
                    outcome.expected
                );
            }
            report.merged.push(MergedModule {
                binary: module.binary.clone(),
                linkage: module.linkage,
                outcome,
            });
        }

        Ok(())
    }

    /// Recreates the destination with vendored files, resources and built artifacts.
    fn stage(&self, targets: &[UmbrellaTarget], report: &BuildReport) -> Result<Vec<PathBuf>> {
        let destination = &self.options.destination;
        remove_dir_if_exists(destination)?;
        fs::create_dir_all(destination)?;

        let mut vendored: Vec<PathBuf> = Vec::new();
        let mut resources: Vec<PathBuf> = Vec::new();
        for target in targets {
            for module in &target.modules {
                let pod_dir = self.options.pod_dir(&module.root);
                vendored.extend(module.vendored.iter().map(|p| pod_dir.join(p)));
                resources.extend(module.resources.iter().map(|p| pod_dir.join(p)));
            }
        }
        dedup_in_order(&mut vendored);
        dedup_in_order(&mut resources);

        let built = report
            .merged
            .iter()
            .filter_map(|m| m.outcome.output.clone())
            .chain(report.macos_products.iter().cloned());

        log::info!(
            "Copying {} xcframeworks to {}",
            report.merged.iter().filter(|m| m.outcome.output.is_some()).count(),
            destination.display()
        );

        let mut staged = Vec::new();
        for source in vendored.into_iter().chain(resources).chain(built) {
            if !source.exists() {
                log::warn!("Skipping missing file {}", source.display());
                continue;
            }
            staged.push(copy_into(&source, destination)?);
        }
        dedup_in_order(&mut staged);
        Ok(staged)
    }
}

fn dedup_in_order(paths: &mut Vec<PathBuf>) {
    let mut seen = BTreeSet::new();
    paths.retain(|p| seen.insert(p.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::ModuleSpec;
    use crate::testing::{is_compile, RecordingRunner};
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::TempDir;

    struct FixedSettings(Linkage);

    impl ProjectSettings for FixedSettings {
        async fn classify(&mut self, _: &str) -> Result<LinkageTable> {
            Ok(LinkageTable::uniform(self.0))
        }

        fn enable_debug_information(&mut self, _: &str) {}

        async fn save(&mut self) -> Result<Option<PathBuf>> {
            Ok(None)
        }
    }

    fn target(platform: &str) -> TargetSpec {
        TargetSpec {
            label: "Pods-App".into(),
            platform: platform.into(),
            deployment_target: Some("12.0".into()),
            modules: vec![ModuleSpec::new("Foo", "FooKit")],
        }
    }

    #[test]
    fn plan_lists_slices_per_platform() {
        let planned = plan(&[target("tvos"), target("osx")]).unwrap();
        assert_eq!(
            planned[0].sdks,
            [Sdk::AppleTvOs, Sdk::AppleTvSimulator, Sdk::MacCatalyst]
        );
        assert!(planned[0].merges);
        assert_eq!(planned[1].sdks, [Sdk::MacOsx]);
        assert!(!planned[1].merges);
        assert_eq!(planned[1].modules, ["FooKit"]);
    }

    #[tokio::test]
    async fn unknown_platform_aborts_before_any_invocation() {
        let tmp = TempDir::new().unwrap();
        let options = RunOptions::new(
            tmp.path().join("Pods"),
            tmp.path().join("Pods/Pods.xcodeproj"),
        );
        let hook_ran = Rc::new(Cell::new(false));
        let flag = hook_ran.clone();

        let mut orchestrator = BuildOrchestrator::new(
            RecordingRunner::succeeding(),
            FixedSettings(Linkage::Static),
            options,
        )
        .with_pre_build_hook(Box::new(move |_: &RunContext<'_>| -> HookFuture {
            flag.set(true);
            Box::pin(async { Ok(()) })
        }));

        let err = orchestrator
            .run(&[target("ios"), target("visionos")])
            .await
            .unwrap_err();
        assert!(matches!(err.root(), ForgeError::Config(_)));
        assert_eq!(err.stage(), Some("plan"));
        assert!(orchestrator.runner().calls().is_empty());
        assert!(!hook_ran.get());
    }

    #[tokio::test]
    async fn missing_build_tree_is_integrity_error() {
        let tmp = TempDir::new().unwrap();
        let options = RunOptions::new(
            tmp.path().join("Pods"),
            tmp.path().join("Pods/Pods.xcodeproj"),
        );
        let mut orchestrator = BuildOrchestrator::new(
            RecordingRunner::succeeding(),
            FixedSettings(Linkage::Dynamic),
            options,
        );

        let err = orchestrator.run(&[target("osx")]).await.unwrap_err();
        assert!(matches!(err.root(), ForgeError::Integrity(_)));
        assert_eq!(err.stage(), Some("verify"));
        assert_eq!(orchestrator.runner().calls_matching(is_compile).len(), 1);
    }

    #[tokio::test]
    async fn failing_pre_hook_stops_the_run() {
        let tmp = TempDir::new().unwrap();
        let options = RunOptions::new(
            tmp.path().join("Pods"),
            tmp.path().join("Pods/Pods.xcodeproj"),
        );
        let mut orchestrator = BuildOrchestrator::new(
            RecordingRunner::succeeding(),
            FixedSettings(Linkage::Dynamic),
            options,
        )
        .with_pre_build_hook(Box::new(|_: &RunContext<'_>| -> HookFuture {
            Box::pin(async { Err(ForgeError::hook("pre_build exited with 1")) })
        }));

        let err = orchestrator.run(&[target("ios")]).await.unwrap_err();
        assert_eq!(err.stage(), Some("pre-build hook"));
        assert!(orchestrator.runner().calls().is_empty());
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut paths = vec![
            PathBuf::from("b"),
            PathBuf::from("a"),
            PathBuf::from("b"),
        ];
        dedup_in_order(&mut paths);
        assert_eq!(paths, [PathBuf::from("b"), PathBuf::from("a")]);
    }
}
