/// xcforge - builds a dependency sandbox into merged xcframeworks
///
/// Every umbrella target is compiled once per SDK slice with `xcodebuild`,
/// each module's slices are packaged into a single `.xcframework`, and the
/// results are staged together with vendored binaries and resources.
///
/// Main modules:
/// - artifact: Deterministic paths of slice products in the build tree
/// - build: Manifest, run options and the target/module model
/// - cli: Command-line interface parsing
/// - commands: Implementation of the build, plan and init commands
/// - merge: Packaging slices into xcframeworks
/// - orchestrator: The end-to-end build pipeline
/// - result: Error handling and result types
/// - symbols: dSYM collection
/// - testing: Recording command runner for tests
/// - toolchain: xcodebuild invocation, simulator selection, project settings
/// - utils: Process and filesystem helpers
pub mod artifact;
pub mod build;
pub mod cli;
pub mod commands;
pub mod merge;
pub mod orchestrator;
pub mod result;
pub mod symbols;
pub mod testing;
pub mod toolchain;
pub mod utils;
