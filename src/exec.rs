//! Host command execution.
//!
//! Link creation and removal shell out (`ln`, `rm`) with elevated
//! privileges. The trait seam lets tests script outcomes instead of spawning
//! processes.

use std::process::Command;

use shell_escape::unix::escape;
use thiserror::Error;
use tracing::debug;

/// Result of running a host command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Single failure kind for host command execution, carrying the rendered
/// command line and captured diagnostics.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("command `{command}` failed: {message}")]
pub struct ExecError {
    /// Shell-quoted command line that failed.
    pub command: String,
    /// Diagnostic text (spawn error or captured stderr).
    pub message: String,
}

/// Abstraction over host command execution to support fakes in tests.
pub trait ShellExecutor: Send + Sync {
    /// Runs `argv`, optionally through `sudo`, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError`] when the command cannot be spawned or exits
    /// non-zero.
    fn execute(&self, argv: &[&str], run_as_root: bool) -> Result<CommandOutput, ExecError>;
}

/// Real executor that shells out to the host operating system.
#[derive(Clone, Debug, Default)]
pub struct ProcessExecutor;

impl ShellExecutor for ProcessExecutor {
    fn execute(&self, argv: &[&str], run_as_root: bool) -> Result<CommandOutput, ExecError> {
        let rendered = render_command(argv, run_as_root);
        debug!(command = %rendered, "running host command");

        let mut full = Vec::with_capacity(argv.len() + 1);
        if run_as_root {
            full.push("sudo");
        }
        full.extend_from_slice(argv);

        let Some((program, args)) = full.split_first() else {
            return Err(ExecError {
                command: rendered,
                message: String::from("empty argv"),
            });
        };

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| ExecError {
                command: rendered.clone(),
                message: err.to_string(),
            })?;

        let captured = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if captured.is_success() {
            return Ok(captured);
        }

        let exit = captured
            .code
            .map_or_else(|| String::from("terminated by signal"), |code| format!("exit code {code}"));
        Err(ExecError {
            command: rendered,
            message: format!("{exit}: {}", captured.stderr.trim()),
        })
    }
}

/// Renders `argv` as a shell-quoted string for logs and error messages.
#[must_use]
pub fn render_command(argv: &[&str], run_as_root: bool) -> String {
    let mut parts = Vec::with_capacity(argv.len() + 1);
    if run_as_root {
        parts.push(String::from("sudo"));
    }
    parts.extend(argv.iter().map(|arg| escape((*arg).into()).into_owned()));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_command_quotes_and_prefixes_sudo() {
        let rendered = render_command(&["ln", "-s", "/dev/vd b", "/links/vol-1"], true);
        assert_eq!(rendered, "sudo ln -s '/dev/vd b' /links/vol-1");
    }

    #[test]
    fn execute_captures_stdout() {
        let executor = ProcessExecutor;
        let result = executor.execute(&["echo", "hello"], false);
        let Ok(output) = result else {
            panic!("echo should succeed");
        };
        assert_eq!(output.stdout.trim(), "hello");
        assert!(output.is_success());
    }

    #[test]
    fn execute_reports_nonzero_exit_as_error() {
        let executor = ProcessExecutor;
        let result = executor.execute(&["false"], false);
        let Err(err) = result else {
            panic!("false should fail");
        };
        assert_eq!(err.command, "false");
        assert!(err.message.contains("exit code 1"));
    }

    #[test]
    fn execute_reports_spawn_failures() {
        let executor = ProcessExecutor;
        let result = executor.execute(&["blocklink-no-such-binary"], false);
        assert!(result.is_err());
    }

    #[test]
    fn execute_rejects_empty_argv() {
        let executor = ProcessExecutor;
        let result = executor.execute(&[], false);
        let Err(err) = result else {
            panic!("empty argv should fail");
        };
        assert_eq!(err.message, "empty argv");
    }
}
