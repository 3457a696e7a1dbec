//! Error types for external command execution.

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::shell::ExecResult;

/// Result type alias for command execution.
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors that can occur while running an external binary.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The binary could not be started.
    #[error("Failed to execute '{program}': {source}")]
    Spawn {
        /// The program that failed to start.
        program: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The binary did not finish within the configured timeout.
    #[error("Command '{program} {args}' timed out after {timeout:?}")]
    Timeout {
        program: String,
        /// Space-joined argument vector.
        args: String,
        timeout: Duration,
    },

    /// The binary returned a non-zero exit code.
    #[error(
        "Command failed: '{program} {args}' (exit code {exit_code}), stdout: {stdout:?}, stderr: {stderr:?}"
    )]
    Failed {
        program: String,
        args: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
}

impl CommandError {
    /// Builds a [`CommandError::Failed`] from a captured result.
    pub fn failed(program: &str, args: &[String], result: &ExecResult) -> Self {
        Self::Failed {
            program: program.to_string(),
            args: args.join(" "),
            exit_code: result.exit_code,
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
        }
    }

    /// Returns the captured standard error, if the command ran at all.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            CommandError::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    /// Returns true if the failure was the control plane refusing the
    /// connection, i.e. it is probably still starting.
    pub fn is_connection_refused(&self) -> bool {
        self.stderr()
            .is_some_and(|stderr| stderr.contains(crate::retry::CONNECTION_REFUSED))
    }
}
