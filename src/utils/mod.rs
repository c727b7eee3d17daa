//! Utility modules for common functionality
//!
//! Environment access, filesystem probes and external process execution.

pub mod env;
pub mod fs;
pub mod process;

pub use env::{Environment, ProcessEnv};
pub use fs::FileSystemUtils;
pub use process::ProcessRunner;
