//! Running external tools.
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::{ModfsError, Result};

/// Result of a command execution.
#[derive(Debug)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, `None` when killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

fn spawn(mut cmd: Command, program: &str) -> Result<ExecResult> {
    let output = cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ModfsError::EnvironmentViolation(format!("{program} is not installed or not on PATH"))
        } else {
            ModfsError::io(Path::new(program), e)
        }
    })?;
    Ok(ExecResult::from(output))
}

fn checked(result: ExecResult, program: &str) -> Result<ExecResult> {
    if result.success {
        Ok(result)
    } else {
        Err(ModfsError::CommandFailed {
            program: program.to_string(),
            code: result.code.unwrap_or(-1),
            stderr: result.stderr.trim().to_string(),
        })
    }
}

/// Run a command and return its output. Fails if the command exits non-zero.
///
/// # Errors
///
/// Returns [`ModfsError::EnvironmentViolation`] if the program is missing
/// and [`ModfsError::CommandFailed`] if it exits non-zero.
pub fn run<S: AsRef<std::ffi::OsStr>>(program: &str, args: &[S]) -> Result<ExecResult> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    checked(spawn(cmd, program)?, program)
}

/// Locate a program on `PATH`.
#[must_use]
pub fn which(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

/// Fail unless `program` is on `PATH`.
///
/// # Errors
///
/// Returns [`ModfsError::EnvironmentViolation`] naming the missing program.
pub fn require(program: &str) -> Result<PathBuf> {
    which(program).ok_or_else(|| {
        ModfsError::EnvironmentViolation(format!("{program} is not installed or not on PATH"))
    })
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn run_echo() {
        let result = run("echo", &["hello"]).unwrap();
        assert!(result.success);
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn run_failure_carries_exit_code() {
        let err = run::<&str>("false", &[]).unwrap_err();
        assert!(matches!(err, ModfsError::CommandFailed { code: 1, .. }));
    }

    #[test]
    fn missing_program_is_environment_violation() {
        let err = run::<&str>("this-program-does-not-exist-12345", &[]).unwrap_err();
        assert!(matches!(err, ModfsError::EnvironmentViolation(_)));
        assert!(require("this-program-does-not-exist-12345").is_err());
    }

    #[test]
    fn which_finds_known_program() {
        assert!(which("sh").is_some());
    }
}
