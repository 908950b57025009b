pub mod destination;
pub mod invoker;
pub mod project;

pub use destination::SimulatorCatalog;
pub use invoker::ToolchainInvoker;
pub use project::{LinkageTable, ProjectSettings, XcodeProjectSettings};
