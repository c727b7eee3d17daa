//! External command execution
//!
//! External commands follow the git convention: `app do` runs the
//! executable `app-do`.

use crate::error::{CliError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, instrument};

/// Runs external executables with inherited stdio
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Executable for an external command, inside `dir` if given,
    /// otherwise left for `$PATH` lookup
    pub fn program_path(dir: Option<&Path>, app_name: &str, command: &str) -> PathBuf {
        let program = format!("{app_name}-{command}");
        match dir {
            Some(dir) => dir.join(program),
            None => PathBuf::from(program),
        }
    }

    /// Run `program` with `args`, failing on a non-zero exit
    #[instrument(skip(self))]
    pub fn run(&self, program: &Path, args: &[String]) -> Result<()> {
        let cmd_str = format!("{} {}", program.display(), args.join(" "));
        debug!("Running external command: {}", cmd_str);

        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| CliError::process(cmd_str.clone(), None, Some(e)))?;

        if !status.success() {
            return Err(CliError::process(cmd_str, status.code(), None));
        }

        debug!("External command completed successfully");
        Ok(())
    }
}
