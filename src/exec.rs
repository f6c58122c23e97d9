//! Command execution behind an injectable [`Executor`] trait.
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::{Command, Output};

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
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

/// Abstraction over process execution so task actions can be unit-tested.
///
/// Production code uses [`SystemExecutor`]; tests record the issued commands
/// instead of running them.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run `program` with `args`. Fails if the command exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exits non-zero.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.run_with_env(program, args, &[])
    }

    /// Run `program` with `args` and extra environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exits non-zero.
    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult>;

    /// Run a command line through `/bin/sh -c`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell cannot be spawned or exits non-zero.
    fn shell(&self, command: &str, env: &[(&str, &str)]) -> Result<ExecResult> {
        self.run_with_env("/bin/sh", &["-c", command], env)
    }

    /// Execute a staged script file directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be executed or exits non-zero.
    fn run_file(&self, path: &Path) -> Result<ExecResult> {
        self.run(&path.to_string_lossy(), &[])
    }
}

/// [`Executor`] that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<ExecResult> {
        if !program.contains('/') {
            which::which(program).with_context(|| format!("{program} not found on PATH"))?;
        }
        let mut cmd = Command::new(program);
        cmd.args(args);
        for (k, v) in env {
            cmd.env(k, v);
        }
        execute_checked(cmd, program)
    }
}

/// Execute a command and return the result, bailing on non-zero exit.
fn execute_checked(mut cmd: Command, label: &str) -> Result<ExecResult> {
    let output = cmd
        .output()
        .with_context(|| format!("failed to execute: {label}"))?;
    let result = ExecResult::from(output);
    if !result.success {
        bail!(
            "{label} failed (exit {}): {}",
            result.code.unwrap_or(-1),
            result.stderr.trim()
        );
    }
    Ok(result)
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn run_echo() {
        let result = SystemExecutor.run("echo", &["hello"]).unwrap();
        assert!(result.success, "echo command should succeed");
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn run_failure() {
        let result = SystemExecutor.run("false", &[]);
        assert!(result.is_err(), "non-zero exit should produce an error");
    }

    #[test]
    fn shell_passes_environment() {
        let result = SystemExecutor
            .shell("echo $GREETING", &[("GREETING", "hi")])
            .unwrap();
        assert_eq!(result.stdout.trim(), "hi");
    }

    #[test]
    fn missing_program_is_reported_before_spawning() {
        let err = SystemExecutor
            .run("this-program-does-not-exist-12345", &[])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "this-program-does-not-exist-12345 not found on PATH"
        );
    }
}
