use crate::build::Linkage;
use crate::result::Result;
use crate::utils::process::{CommandRunner, Invocation};
use serde::Deserialize;
use smol_str::SmolStr;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const OVERRIDES_FILE: &str = "xcforge.xcconfig";

/// Linkage per project target, with a project-wide fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkageTable {
    pub targets: HashMap<SmolStr, Linkage>,
    pub default: Linkage,
}

impl LinkageTable {
    pub fn uniform(linkage: Linkage) -> Self {
        Self {
            targets: HashMap::new(),
            default: linkage,
        }
    }

    /// Linkage of the target named after the module root, else the project default.
    pub fn for_module(&self, root: &str) -> Linkage {
        self.targets.get(root).copied().unwrap_or(self.default)
    }
}

/** Read/write access to the generated project's build settings
 *
 * Implementations classify targets as static or dynamic and persist the
 * settings needed to emit debug symbols for every architecture.
 */
#[allow(async_fn_in_trait)]
pub trait ProjectSettings {
    async fn classify(&mut self, configuration: &str) -> Result<LinkageTable>;

    /// Requests `DEBUG_INFORMATION_FORMAT = dwarf-with-dsym` and `ONLY_ACTIVE_ARCH = NO`.
    fn enable_debug_information(&mut self, configuration: &str);

    /// Persists pending changes; returns an xcconfig to pass to every build, if any.
    async fn save(&mut self) -> Result<Option<PathBuf>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetSettings {
    target: SmolStr,
    #[serde(default)]
    build_settings: HashMap<String, String>,
}

/// Parses `xcodebuild -showBuildSettings -json` into a linkage table.
///
/// The project default is taken from the first target listed.
pub fn parse_build_settings(json: &str) -> Result<LinkageTable> {
    let entries: Vec<TargetSettings> = serde_json::from_str(json)?;
    let mut table = LinkageTable::uniform(Linkage::Dynamic);

    for (i, entry) in entries.iter().enumerate() {
        let linkage = Linkage::from_mach_o_type(
            entry
                .build_settings
                .get("MACH_O_TYPE")
                .map(String::as_str)
                .unwrap_or_default(),
        );
        if i == 0 {
            table.default = linkage;
        }
        table.targets.entry(entry.target.clone()).or_insert(linkage);
    }

    Ok(table)
}

/// Project settings backed by `xcodebuild` and an overrides xcconfig.
pub struct XcodeProjectSettings<R: CommandRunner> {
    runner: R,
    program: String,
    project: PathBuf,
    pending: BTreeMap<&'static str, &'static str>,
    configuration: Option<String>,
}

impl<R: CommandRunner> XcodeProjectSettings<R> {
    pub fn new(runner: R, project: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            program: "xcodebuild".to_string(),
            project: project.into(),
            pending: BTreeMap::new(),
            configuration: None,
        }
    }

    /// Path or name of the `xcodebuild` executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn overrides_path(&self) -> PathBuf {
        self.project
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(OVERRIDES_FILE)
    }

    fn render_overrides(&self) -> String {
        let mut out = format!(
            "// Generated by xcforge for the {} configuration\n",
            self.configuration.as_deref().unwrap_or("active")
        );
        for (key, value) in &self.pending {
            out.push_str(&format!("{} = {}\n", key, value));
        }
        out
    }
}

impl<R: CommandRunner> ProjectSettings for XcodeProjectSettings<R> {
    async fn classify(&mut self, configuration: &str) -> Result<LinkageTable> {
        let invocation = Invocation::new(self.program.clone())
            .arg("-project")
            .path_arg(&self.project)
            .args(["-configuration", configuration])
            .args(["-showBuildSettings", "-json", "-alltargets"])
            .capture_stdout();

        let output = self.runner.run_checked(&invocation).await?;
        let table = parse_build_settings(&output.stdout)?;
        log::info!(
            "Project {} links {} by default ({} targets)",
            self.project.display(),
            table.default,
            table.targets.len()
        );
        Ok(table)
    }

    fn enable_debug_information(&mut self, configuration: &str) {
        self.configuration = Some(configuration.to_string());
        self.pending
            .insert("DEBUG_INFORMATION_FORMAT", "dwarf-with-dsym");
        self.pending.insert("ONLY_ACTIVE_ARCH", "NO");
    }

    async fn save(&mut self) -> Result<Option<PathBuf>> {
        if self.pending.is_empty() {
            return Ok(None);
        }

        let path = self.overrides_path();
        fs::write(&path, self.render_overrides()).await?;
        log::info!("Wrote build setting overrides to {}", path.display());
        Ok(Some(path))
    }
}
