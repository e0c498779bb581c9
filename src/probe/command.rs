//! External command execution
//!
//! Status and restart commands are operator-provided shell snippets
//! (`systemctl status nginx`, `docker compose restart api`, ...), so they run
//! through `sh -c`. A command that cannot even be launched is reported as a
//! failed `CommandOutput`, never as an error.
//!
//! No timeout is applied here: a hung `systemctl` call blocks the calling
//! monitor task until the OS gives up.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Exit code reported when the command could not be spawned at all
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = 1;

/// Exit code reported when the process was terminated by a signal
pub const SIGNALLED_EXIT_CODE: i32 = -1;

/// Captured result of one command invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Synthetic output for a command that could not be launched
    pub fn launch_failure(error: impl std::fmt::Display) -> Self {
        Self::failed(LAUNCH_FAILURE_EXIT_CODE, error.to_string())
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs shell commands on behalf of the probe and the restart executor
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> CommandOutput;
}

/// Runs commands through a POSIX shell
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("sh")
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> CommandOutput {
        debug!("Running command: {}", command);

        let result = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await;

        match result {
            Ok(output) => CommandOutput {
                exit_code: output.status.code().unwrap_or(SIGNALLED_EXIT_CODE),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(e) => {
                debug!("Failed to launch {:?}: {}", command, e);
                CommandOutput::launch_failure(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shell_runner_captures_output() {
        let runner = ShellRunner::default();
        let output = runner.run("echo active; echo warn >&2").await;

        assert!(output.success());
        assert_eq!(output.stdout.trim(), "active");
        assert_eq!(output.stderr.trim(), "warn");
    }

    #[tokio::test]
    async fn test_shell_runner_reports_exit_code() {
        let runner = ShellRunner::default();
        let output = runner.run("exit 3").await;

        assert!(!output.success());
        assert_eq!(output.exit_code, 3);
    }

    #[tokio::test]
    async fn test_missing_shell_is_captured() {
        let runner = ShellRunner::new("/nonexistent/shell");
        let output = runner.run("true").await;

        assert_eq!(output.exit_code, LAUNCH_FAILURE_EXIT_CODE);
        assert!(output.stdout.is_empty());
        assert!(!output.stderr.is_empty());
    }
}
