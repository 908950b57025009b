pub mod fs;
pub mod process;

pub use process::{CommandOutput, CommandRunner, Invocation, ProcessRunner};
