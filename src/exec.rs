//! External command execution behind an injectable [`Executor`] trait.
use anyhow::{Context as _, Result, bail};
use std::process::{Command, Output, Stdio};
use std::time::Duration;

/// How long a detached process must stay alive to count as started.
pub const LIVENESS_WINDOW: Duration = Duration::from_millis(300);

/// Result of a command execution.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Captured standard output (empty for interactive runs).
    pub stdout: String,
    /// Captured standard error (empty for interactive runs).
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

/// Abstraction over process spawning so resources can be tested without
/// touching the host.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run a command with captured output. Fails if the command exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started or exits non-zero.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command with captured output, returning the result even on
    /// non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns an error only if the program cannot be started.
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command attached to the operator's terminal so its output is
    /// streamed verbatim and it may prompt (e.g. `sudo`). The exit status is
    /// returned without being checked.
    ///
    /// # Errors
    ///
    /// Returns an error only if the program cannot be started.
    fn run_interactive(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Start a long-running helper in its own process group with no
    /// inherited stdio, and confirm it survives [`LIVENESS_WINDOW`].
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started or exits with a
    /// failure status inside the liveness window.
    fn spawn_detached(&self, program: &str, args: &[&str]) -> Result<()>;

    /// Check if a program is available on `PATH`.
    fn which(&self, program: &str) -> bool;
}

/// [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let result = self.run_unchecked(program, args)?;
        if !result.success {
            bail!(
                "{program} failed (exit {}): {}",
                result.code.unwrap_or(-1),
                result.stderr.trim()
            );
        }
        Ok(result)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult::from(output))
    }

    fn run_interactive(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let status = Command::new(program)
            .args(args)
            .status()
            .with_context(|| format!("failed to execute: {program}"))?;
        Ok(ExecResult {
            success: status.success(),
            code: status.code(),
            ..ExecResult::default()
        })
    }

    fn spawn_detached(&self, program: &str, args: &[&str]) -> Result<()> {
        use std::os::unix::process::CommandExt as _;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .with_context(|| format!("failed to start: {program}"))?;

        std::thread::sleep(LIVENESS_WINDOW);
        match child
            .try_wait()
            .with_context(|| format!("checking {program}"))?
        {
            Some(status) if !status.success() => {
                bail!("{program} exited immediately ({status})")
            }
            _ => Ok(()),
        }
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Render a program and its arguments as a single shell-like line.
#[must_use]
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
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
    fn run_unchecked_failure() {
        let result = SystemExecutor.run_unchecked("false", &[]).unwrap();
        assert!(!result.success, "non-zero exit should set success=false");
        assert_eq!(result.code, Some(1));
    }

    #[test]
    fn run_interactive_reports_status() {
        let ok = SystemExecutor.run_interactive("true", &[]).unwrap();
        assert!(ok.success);
        let failed = SystemExecutor.run_interactive("false", &[]).unwrap();
        assert!(!failed.success);
    }

    #[test]
    fn spawn_detached_accepts_long_running_process() {
        SystemExecutor.spawn_detached("sleep", &["2"]).unwrap();
    }

    #[test]
    fn spawn_detached_rejects_immediate_failure() {
        let err = SystemExecutor.spawn_detached("false", &[]).unwrap_err();
        assert!(err.to_string().contains("exited immediately"));
    }

    #[test]
    fn spawn_detached_missing_program() {
        assert!(
            SystemExecutor
                .spawn_detached("this-program-does-not-exist-12345", &[])
                .is_err()
        );
    }

    #[test]
    fn which_finds_known_program() {
        assert!(SystemExecutor.which("sh"), "sh should be found on Unix");
    }

    #[test]
    fn which_missing_program() {
        assert!(
            !SystemExecutor.which("this-program-does-not-exist-12345"),
            "non-existent program should not be found"
        );
    }

    #[test]
    fn command_line_joins_arguments() {
        assert_eq!(
            command_line("systemctl", &["--user", "enable", "waycorner"]),
            "systemctl --user enable waycorner"
        );
        assert_eq!(command_line("true", &[]), "true");
    }
}
