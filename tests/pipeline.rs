//! End-to-end pipeline scenarios against a simulated `xcodebuild`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use xcforge::artifact;
use xcforge::build::{Linkage, ModuleSpec, RunOptions, Sdk, TargetSpec};
use xcforge::orchestrator::{BuildOrchestrator, BuildReport};
use xcforge::result::{ForgeError, Result};
use xcforge::testing::{is_compile, is_packaging, RecordingRunner};
use xcforge::toolchain::XcodeProjectSettings;
use xcforge::utils::process::{CommandOutput, Invocation};

const SIMCTL: &str = r#"{
  "devices": {
    "com.apple.CoreSimulator.SimRuntime.iOS-15-5": [
      { "udid": "IOS-15", "name": "iPhone 8", "isAvailable": true }
    ],
    "com.apple.CoreSimulator.SimRuntime.iOS-17-0": [
      { "udid": "IOS-17", "name": "iPhone 15", "isAvailable": true }
    ],
    "com.apple.CoreSimulator.SimRuntime.tvOS-16-0": [
      { "udid": "TVOS-16", "name": "Apple TV", "isAvailable": true }
    ],
    "com.apple.CoreSimulator.SimRuntime.watchOS-9-0": [
      { "udid": "WATCH-9", "name": "Apple Watch", "isAvailable": true }
    ]
  }
}"#;

/// Answers like `xcodebuild` would: products appear under `SYMROOT`.
struct FakeXcode {
    modules: Vec<(String, String)>,
    linkage: Linkage,
    failing: HashSet<Sdk>,
    missing: HashSet<Sdk>,
}

impl FakeXcode {
    fn new(linkage: Linkage, modules: &[(&str, &str)]) -> Self {
        Self {
            modules: modules
                .iter()
                .map(|(r, b)| (r.to_string(), b.to_string()))
                .collect(),
            linkage,
            failing: HashSet::new(),
            missing: HashSet::new(),
        }
    }

    fn failing_on(mut self, sdk: Sdk) -> Self {
        self.failing.insert(sdk);
        self
    }

    fn skipping_output_for(mut self, sdk: Sdk) -> Self {
        self.missing.insert(sdk);
        self
    }

    fn runner(self) -> RecordingRunner {
        let fake = Arc::new(self);
        RecordingRunner::new(move |inv| fake.respond(inv))
    }

    fn sdk_of(inv: &Invocation) -> Sdk {
        const ALL: [Sdk; 8] = [
            Sdk::IphoneOs,
            Sdk::IphoneSimulator,
            Sdk::AppleTvOs,
            Sdk::AppleTvSimulator,
            Sdk::WatchOs,
            Sdk::WatchSimulator,
            Sdk::MacCatalyst,
            Sdk::MacOsx,
        ];
        match inv.value_of("-sdk") {
            Some(name) => ALL
                .into_iter()
                .find(|sdk| sdk.as_str() == name)
                .unwrap_or_else(|| panic!("unexpected sdk {}", name)),
            None => Sdk::MacCatalyst,
        }
    }

    fn respond(&self, inv: &Invocation) -> Result<CommandOutput> {
        if inv.program == "xcrun" {
            return Ok(CommandOutput::with_stdout(SIMCTL));
        }
        if is_packaging(inv) {
            let output = Path::new(inv.value_of("-output").expect("output"));
            fs::create_dir_all(output)?;
            fs::write(output.join("Info.plist"), "<plist/>")?;
            return Ok(CommandOutput::success());
        }

        let symroot = inv
            .args
            .iter()
            .find_map(|a| a.strip_prefix("SYMROOT="))
            .expect("SYMROOT pinned");
        let configuration = inv.value_of("-configuration").expect("configuration");
        let sdk = Self::sdk_of(inv);

        if self.failing.contains(&sdk) {
            return Ok(CommandOutput::failure(65, "** BUILD FAILED **"));
        }
        if self.missing.contains(&sdk) {
            fs::create_dir_all(artifact::products_dir(Path::new(symroot), configuration, sdk))?;
            return Ok(CommandOutput::success());
        }

        for (root, binary) in &self.modules {
            let product = artifact::slice_path(
                Path::new(symroot),
                configuration,
                sdk,
                root,
                binary,
                self.linkage,
            );
            fs::create_dir_all(product.parent().unwrap())?;
            match self.linkage {
                Linkage::Static => fs::write(&product, b"!<arch>\n")?,
                Linkage::Dynamic => fs::create_dir_all(&product)?,
            }
            let dsym = product
                .parent()
                .unwrap()
                .join(format!("{}.framework.dSYM", binary));
            fs::create_dir_all(dsym.join("Contents"))?;
        }
        Ok(CommandOutput::success())
    }
}

struct Workspace {
    _tmp: TempDir,
    root: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        fs::create_dir_all(root.join("Pods/Pods.xcodeproj")).unwrap();
        Self { _tmp: tmp, root }
    }

    fn options(&self) -> RunOptions {
        RunOptions::new(self.root.join("Pods"), self.root.join("Pods/Pods.xcodeproj"))
    }

    fn public_header(&self, module: &str, name: &str) {
        let dir = self.root.join("Pods/Headers/Public").join(module);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), "// header").unwrap();
    }

    fn destination(&self) -> PathBuf {
        self.root.join("Frameworks")
    }

    fn destination_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.destination())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn settings(project: &Path, mach_o_type: &str) -> XcodeProjectSettings<RecordingRunner> {
    let json = format!(
        r#"[{{ "target": "Foo", "buildSettings": {{ "MACH_O_TYPE": "{}" }} }}]"#,
        mach_o_type
    );
    XcodeProjectSettings::new(
        RecordingRunner::new(move |_| Ok(CommandOutput::with_stdout(json.clone()))),
        project,
    )
}

fn target(platform: &str, modules: Vec<ModuleSpec>) -> TargetSpec {
    TargetSpec {
        label: "Pods-App".into(),
        platform: platform.into(),
        deployment_target: Some("15.0".into()),
        modules,
    }
}

async fn run(
    runner: RecordingRunner,
    mach_o_type: &str,
    options: RunOptions,
    targets: &[TargetSpec],
) -> (std::result::Result<BuildReport, ForgeError>, Vec<Invocation>) {
    let settings = settings(&options.project, mach_o_type);
    let mut orchestrator = BuildOrchestrator::new(runner, settings, options);
    let result = orchestrator.run(targets).await;
    (result, orchestrator.runner().calls())
}

#[tokio::test]
async fn static_ios_module_is_merged_and_staged() {
    let ws = Workspace::new();
    ws.public_header("FooKit", "FooKit.h");
    let runner = FakeXcode::new(Linkage::Static, &[("Foo", "FooKit")]).runner();

    let (result, calls) = run(
        runner,
        "staticlib",
        ws.options(),
        &[target("ios", vec![ModuleSpec::new("Foo", "FooKit")])],
    )
    .await;
    let report = result.unwrap();

    let compiles: Vec<_> = calls.iter().filter(|c| is_compile(c)).collect();
    assert_eq!(compiles.len(), 3);
    assert_eq!(compiles[0].value_of("-sdk"), Some("iphoneos"));
    assert_eq!(compiles[1].value_of("-sdk"), Some("iphonesimulator"));
    assert_eq!(compiles[1].value_of("-destination"), Some("id=IOS-15"));
    assert!(compiles[2].has_arg("ARCHS=x86_64"));

    let packaging: Vec<_> = calls.iter().filter(|c| is_packaging(c)).collect();
    assert_eq!(packaging.len(), 1);
    assert_eq!(packaging[0].values_of("-library").count(), 3);
    let headers: Vec<_> = packaging[0].values_of("-headers").collect();
    assert_eq!(headers.len(), 3);
    assert!(headers.iter().all(|h| h.ends_with("/Headers")));
    assert!(packaging[0]
        .value_of("-output")
        .unwrap()
        .ends_with("build/FooKit.xcframework"));

    assert_eq!(report.static_modules, 1);
    assert_eq!(ws.destination_entries(), ["FooKit.xcframework"]);
    assert!(!ws.root.join("build").exists(), "intermediates are removed");
    assert!(ws
        .root
        .join("dSYM/iphoneos/FooKit.framework.dSYM")
        .is_dir());
    assert!(ws.root.join("Pods/xcforge.xcconfig").is_file());
}

#[tokio::test]
async fn dynamic_merge_never_passes_headers() {
    let ws = Workspace::new();
    let runner = FakeXcode::new(Linkage::Dynamic, &[("Foo", "FooKit"), ("Bar", "Bar")]).runner();

    let (result, calls) = run(
        runner,
        "mh_dylib",
        ws.options(),
        &[target(
            "ios",
            vec![ModuleSpec::new("Foo", "FooKit"), ModuleSpec::new("Bar", "Bar")],
        )],
    )
    .await;
    let report = result.unwrap();

    let packaging: Vec<_> = calls.iter().filter(|c| is_packaging(c)).collect();
    assert_eq!(packaging.len(), 2);
    for call in packaging {
        assert_eq!(call.values_of("-framework").count(), 3);
        assert!(!call.has_arg("-headers"));
    }
    assert_eq!(report.dynamic_modules, 2);
    assert_eq!(
        ws.destination_entries(),
        ["Bar.xcframework", "FooKit.xcframework"]
    );
}

#[tokio::test]
async fn catalyst_failure_aborts_before_merge() {
    let ws = Workspace::new();
    ws.public_header("FooKit", "FooKit.h");
    fs::create_dir_all(ws.destination()).unwrap();
    fs::write(ws.destination().join("previous.txt"), "keep").unwrap();

    let runner = FakeXcode::new(Linkage::Static, &[("Foo", "FooKit")])
        .failing_on(Sdk::MacCatalyst)
        .runner();

    let (result, calls) = run(
        runner,
        "staticlib",
        ws.options(),
        &[target("ios", vec![ModuleSpec::new("Foo", "FooKit")])],
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.stage(), Some("build"));
    assert!(matches!(err.root(), ForgeError::Process(_)));
    assert!(calls.iter().all(|c| !is_packaging(c)));
    assert_eq!(ws.destination_entries(), ["previous.txt"]);
    assert!(ws.root.join("build").is_dir(), "intermediates survive a failed run");
}

#[tokio::test]
async fn macos_target_stages_its_own_product() {
    let ws = Workspace::new();
    let runner = FakeXcode::new(Linkage::Dynamic, &[("Foo", "FooKit")]).runner();

    let (result, calls) = run(
        runner,
        "mh_dylib",
        ws.options(),
        &[target("osx", vec![ModuleSpec::new("Foo", "FooKit")])],
    )
    .await;
    let report = result.unwrap();

    assert_eq!(calls.iter().filter(|c| is_compile(c)).count(), 1);
    assert_eq!(calls.iter().filter(|c| is_packaging(c)).count(), 0);
    assert!(report.merged.is_empty());
    assert_eq!(ws.destination_entries(), ["FooKit.framework"]);
}

#[tokio::test]
async fn missing_slice_yields_partial_artifact() {
    let ws = Workspace::new();
    let runner = FakeXcode::new(Linkage::Dynamic, &[("Foo", "FooKit")])
        .skipping_output_for(Sdk::IphoneSimulator)
        .runner();

    let (result, calls) = run(
        runner,
        "mh_dylib",
        ws.options(),
        &[target("ios", vec![ModuleSpec::new("Foo", "FooKit")])],
    )
    .await;
    let report = result.unwrap();

    let packaging: Vec<_> = calls.iter().filter(|c| is_packaging(c)).collect();
    assert_eq!(packaging[0].values_of("-framework").count(), 2);
    assert_eq!(report.partial().count(), 1);
    assert_eq!(ws.destination_entries(), ["FooKit.xcframework"]);
}

#[tokio::test]
async fn second_run_replaces_destination_contents() {
    let ws = Workspace::new();

    let (first, _) = run(
        FakeXcode::new(Linkage::Dynamic, &[("Foo", "FooKit")]).runner(),
        "mh_dylib",
        ws.options(),
        &[target("ios", vec![ModuleSpec::new("Foo", "FooKit")])],
    )
    .await;
    first.unwrap();
    assert_eq!(ws.destination_entries(), ["FooKit.xcframework"]);

    let (second, _) = run(
        FakeXcode::new(Linkage::Dynamic, &[("Bar", "Bar")]).runner(),
        "mh_dylib",
        ws.options(),
        &[target("ios", vec![ModuleSpec::new("Bar", "Bar")])],
    )
    .await;
    second.unwrap();
    assert_eq!(ws.destination_entries(), ["Bar.xcframework"]);
}

#[tokio::test]
async fn vendored_files_and_resources_are_copied() {
    let ws = Workspace::new();
    let pod = ws.root.join("Pods/Foo");
    fs::create_dir_all(pod.join("Vendor/Bar.xcframework")).unwrap();
    fs::create_dir_all(pod.join("Assets")).unwrap();
    fs::write(pod.join("Assets/Foo.bundle"), "res").unwrap();

    let mut module = ModuleSpec::new("Foo", "FooKit");
    module.vendored = vec!["Vendor/Bar.xcframework".into(), "Vendor/Missing.a".into()];
    module.resources = vec!["Assets/Foo.bundle".into()];

    let (result, _) = run(
        FakeXcode::new(Linkage::Dynamic, &[("Foo", "FooKit")]).runner(),
        "mh_dylib",
        ws.options(),
        &[target("ios", vec![module])],
    )
    .await;
    let report = result.unwrap();

    assert_eq!(report.staged.len(), 3);
    assert_eq!(
        ws.destination_entries(),
        ["Bar.xcframework", "Foo.bundle", "FooKit.xcframework"]
    );
}

#[tokio::test]
async fn unknown_platform_issues_no_invocations() {
    let ws = Workspace::new();
    let (result, calls) = run(
        FakeXcode::new(Linkage::Dynamic, &[("Foo", "FooKit")]).runner(),
        "mh_dylib",
        ws.options(),
        &[target("visionos", vec![ModuleSpec::new("Foo", "FooKit")])],
    )
    .await;

    assert!(matches!(result.unwrap_err().root(), ForgeError::Config(_)));
    assert!(calls.is_empty());
    assert!(!ws.destination().exists());
}

#[tokio::test]
async fn disabling_dsyms_skips_collection_and_overrides() {
    let ws = Workspace::new();
    let mut options = ws.options();
    options.debug_symbols = false;

    let (result, calls) = run(
        FakeXcode::new(Linkage::Dynamic, &[("Foo", "FooKit")]).runner(),
        "mh_dylib",
        options,
        &[target("ios", vec![ModuleSpec::new("Foo", "FooKit")])],
    )
    .await;
    let report = result.unwrap();

    assert!(report.dsyms.is_empty());
    assert!(!ws.root.join("dSYM").exists());
    assert!(calls.iter().all(|c| !c.has_arg("-xcconfig")));
}

#[tokio::test]
async fn tvos_and_watchos_targets_use_their_own_sdks() {
    let ws = Workspace::new();
    let targets = [
        TargetSpec {
            deployment_target: Some("16.0".into()),
            ..target("tvos", vec![ModuleSpec::new("Foo", "FooKit")])
        },
        TargetSpec {
            deployment_target: Some("9.0".into()),
            ..target("watchos", vec![ModuleSpec::new("Foo", "FooKit")])
        },
    ];

    let (result, calls) = run(
        FakeXcode::new(Linkage::Dynamic, &[("Foo", "FooKit")]).runner(),
        "mh_dylib",
        ws.options(),
        &targets,
    )
    .await;
    let report = result.unwrap();

    let sdks: Vec<_> = calls
        .iter()
        .filter(|c| is_compile(c))
        .map(|c| c.value_of("-sdk").unwrap_or("catalyst"))
        .collect();
    assert_eq!(
        sdks,
        [
            "appletvos",
            "appletvsimulator",
            "catalyst",
            "watchos",
            "watchsimulator",
            "catalyst"
        ]
    );
    let destinations: Vec<_> = calls
        .iter()
        .filter(|c| is_compile(c))
        .filter_map(|c| c.value_of("-destination"))
        .filter(|d| d.starts_with("id="))
        .collect();
    assert_eq!(destinations, ["id=TVOS-16", "id=WATCH-9"]);

    let packaging: Vec<_> = calls.iter().filter(|c| is_packaging(c)).collect();
    assert_eq!(packaging.len(), 2);
    assert!(packaging
        .iter()
        .all(|c| c.values_of("-framework").count() == 3));

    assert_eq!(report.merged.len(), 2);
    assert_eq!(report.dynamic_modules, 1, "a shared module is counted once");
    assert!(ws.root.join("dSYM/appletvos/FooKit.framework.dSYM").is_dir());
    assert!(ws.root.join("dSYM/watchsimulator/FooKit.framework.dSYM").is_dir());
    assert_eq!(ws.destination_entries(), ["FooKit.xcframework"]);
}
