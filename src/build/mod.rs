pub mod config;
pub mod target;

pub use config::{BuildManifest, RunOptions, DEFAULT_MANIFEST};
pub use target::{
    resolve_targets, Linkage, Module, ModuleSpec, Platform, Sdk, TargetSpec, UmbrellaTarget,
};
