use std::borrow::Cow;
use thiserror::Error;

/** Main Result type alias for xcforge operations
 *
 * # Usage
 * ```no_run
 * use xcforge::result::Result;
 *
 * fn read_manifest() -> Result<String> {
 *     // Function automatically propagates ForgeError
 *     let content = std::fs::read_to_string("xcforge.toml")?;
 *     Ok(content)
 * }
 * ```
 */
pub type Result<T> = std::result::Result<T, ForgeError>;

/** Error enumeration for the build pipeline
 *
 * # Error Categories
 * - **Io**: File system operations on the build and destination trees
 * - **Process**: An external toolchain command failed or could not start
 * - **Config**: Manifest problems and unrecognized platforms
 * - **Integrity**: The build tree is missing after the build phase
 * - **NotFound**: Missing executables, manifests or inputs
 * - **Hook**: A pre/post build hook reported failure
 * - **Stage**: Any of the above, tagged with the pipeline stage it aborted
 */
#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Process error: {0}")]
    Process(Cow<'static, str>),

    #[error("Config error: {0}")]
    Config(Cow<'static, str>),

    #[error("Integrity error: {0}")]
    Integrity(Cow<'static, str>),

    #[error("Not found: {0}")]
    NotFound(Cow<'static, str>),

    #[error("Hook error: {0}")]
    Hook(Cow<'static, str>),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<ForgeError>,
    },

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ForgeError {
    pub const BUILD_TREE_NOT_FOUND: &'static str =
        "The build directory was not found in the expected location";
    pub const XCODEBUILD_NOT_FOUND: &'static str = "xcodebuild not found on PATH";

    pub fn process(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Process(msg.into())
    }

    pub fn config(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Config(msg.into())
    }

    pub fn integrity(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn hook(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Hook(msg.into())
    }

    /** Tags an error with the pipeline stage that raised it
     *
     * Errors already carrying a stage keep the innermost one.
     */
    pub fn at_stage(self, stage: &'static str) -> Self {
        match self {
            already @ Self::Stage { .. } => already,
            other => Self::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Unwraps stage tagging to expose the underlying error kind.
    pub fn root(&self) -> &ForgeError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Self::Stage { stage, .. } => Some(stage),
            _ => None,
        }
    }
}
