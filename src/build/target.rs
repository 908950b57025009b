use crate::result::{ForgeError, Result};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Apple platforms an umbrella target can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Ios,
    Tvos,
    Watchos,
    Macos,
}

impl Platform {
    /// Device and simulator SDKs; `None` for macOS, which builds a single slice.
    pub fn slice_sdks(self) -> Option<(Sdk, Sdk)> {
        match self {
            Platform::Ios => Some((Sdk::IphoneOs, Sdk::IphoneSimulator)),
            Platform::Tvos => Some((Sdk::AppleTvOs, Sdk::AppleTvSimulator)),
            Platform::Watchos => Some((Sdk::WatchOs, Sdk::WatchSimulator)),
            Platform::Macos => None,
        }
    }

    /// Every SDK whose products this platform leaves in the build tree.
    pub fn built_sdks(self) -> Vec<Sdk> {
        match self.slice_sdks() {
            Some((device, simulator)) => vec![device, simulator, Sdk::MacCatalyst],
            None => vec![Sdk::MacOsx],
        }
    }
}

impl FromStr for Platform {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ios" => Ok(Platform::Ios),
            "tvos" => Ok(Platform::Tvos),
            "watchos" => Ok(Platform::Watchos),
            "macos" | "osx" => Ok(Platform::Macos),
            _ => Err(ForgeError::config(format!("Unknown platform '{}'", s))),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Platform::Ios => "iOS",
            Platform::Tvos => "tvOS",
            Platform::Watchos => "watchOS",
            Platform::Macos => "macOS",
        })
    }
}

/// SDK identifiers as understood by `xcodebuild -sdk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sdk {
    IphoneOs,
    IphoneSimulator,
    AppleTvOs,
    AppleTvSimulator,
    WatchOs,
    WatchSimulator,
    MacCatalyst,
    MacOsx,
}

impl Sdk {
    pub fn as_str(self) -> &'static str {
        match self {
            Sdk::IphoneOs => "iphoneos",
            Sdk::IphoneSimulator => "iphonesimulator",
            Sdk::AppleTvOs => "appletvos",
            Sdk::AppleTvSimulator => "appletvsimulator",
            Sdk::WatchOs => "watchos",
            Sdk::WatchSimulator => "watchsimulator",
            Sdk::MacCatalyst => "maccatalyst",
            Sdk::MacOsx => "macosx",
        }
    }

    /// Runtime platform name used by `simctl` for simulator SDKs.
    pub fn simulator_platform(self) -> Option<&'static str> {
        match self {
            Sdk::IphoneSimulator => Some("iOS"),
            Sdk::AppleTvSimulator => Some("tvOS"),
            Sdk::WatchSimulator => Some("watchOS"),
            _ => None,
        }
    }
}

impl fmt::Display for Sdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a module's binary is a static archive or a framework bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    Static,
    Dynamic,
}

impl Linkage {
    /// Maps a `MACH_O_TYPE` build setting to a linkage.
    pub fn from_mach_o_type(value: &str) -> Self {
        if value == "staticlib" {
            Linkage::Static
        } else {
            Linkage::Dynamic
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Linkage::Static => "static",
            Linkage::Dynamic => "dynamic",
        })
    }
}

/// A module as declared in the manifest, before linkage is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub root: SmolStr,
    /// Module name; defaults to `root` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vendored: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<PathBuf>,
}

impl ModuleSpec {
    pub fn new(root: impl Into<SmolStr>, binary: impl Into<SmolStr>) -> Self {
        Self {
            root: root.into(),
            binary: Some(binary.into()),
            vendored: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn binary_id(&self) -> &str {
        self.binary.as_deref().unwrap_or(&self.root)
    }

    pub fn with_linkage(&self, linkage: Linkage) -> Module {
        Module {
            root: self.root.clone(),
            binary: self.binary_id().into(),
            linkage,
            vendored: self.vendored.clone(),
            resources: self.resources.clone(),
        }
    }
}

/// A buildable unit with its linkage resolved for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub root: SmolStr,
    pub binary: SmolStr,
    pub linkage: Linkage,
    pub vendored: Vec<PathBuf>,
    pub resources: Vec<PathBuf>,
}

/// An umbrella target as declared in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSpec {
    pub label: SmolStr,
    pub platform: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_target: Option<String>,
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
}

impl TargetSpec {
    /// Resolves the platform name; unknown names are configuration errors.
    pub fn resolve(&self) -> Result<UmbrellaTarget> {
        let platform = self.platform.parse::<Platform>().map_err(|_| {
            ForgeError::config(format!(
                "Unknown platform '{}' for target {}",
                self.platform, self.label
            ))
        })?;

        Ok(UmbrellaTarget {
            label: self.label.clone(),
            platform,
            deployment_target: self.deployment_target.clone(),
            modules: self.modules.clone(),
        })
    }
}

/// Targets that own at least one module, with platforms resolved.
///
/// Fails on the first unknown platform, before anything is built.
pub fn resolve_targets(targets: &[TargetSpec]) -> Result<Vec<UmbrellaTarget>> {
    targets
        .iter()
        .filter(|t| !t.modules.is_empty())
        .map(TargetSpec::resolve)
        .collect()
}

/// An umbrella target with a typed platform.
#[derive(Debug, Clone)]
pub struct UmbrellaTarget {
    pub label: SmolStr,
    pub platform: Platform,
    pub deployment_target: Option<String>,
    pub modules: Vec<ModuleSpec>,
}

impl UmbrellaTarget {
    /// Modules de-duplicated by (root, binary id), in declaration order.
    pub fn unique_modules(&self) -> Vec<&ModuleSpec> {
        let mut seen: Vec<(&str, &str)> = Vec::new();
        let mut out = Vec::new();
        for module in &self.modules {
            let key = (module.root.as_str(), module.binary_id());
            if !seen.contains(&key) {
                seen.push(key);
                out.push(module);
            }
        }
        out
    }
}
