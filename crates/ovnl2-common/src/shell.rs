//! Subprocess execution for the control-plane and link binaries.
//!
//! Commands are executed directly with an argument vector, never through a
//! shell, so logical port names and external-id values need no quoting.
//!
//! # Example
//!
//! ```ignore
//! use ovnl2_common::shell::{CommandRunner, SystemRunner, OVS_VSCTL_CMD};
//!
//! let runner = SystemRunner::default();
//! let result = runner.exec(OVS_VSCTL_CMD, &["--timeout=15".into(), "show".into()]).await?;
//! if !result.success() {
//!     eprintln!("Failed with code {}: {}", result.exit_code, result.stderr);
//! }
//! ```

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{CommandError, CommandResult};

/// The OVN northbound database client.
pub const OVN_NBCTL_CMD: &str = "ovn-nbctl";

/// The local Open vSwitch database client.
pub const OVS_VSCTL_CMD: &str = "ovs-vsctl";

/// The iproute2 `ip` command for link and address configuration.
pub const IP_CMD: &str = "ip";

/// Default wall-clock bound on a single subprocess.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(20);

/// Result of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// The exit code of the command (0 = success, -1 = killed by signal).
    pub exit_code: i32,
    /// Standard output, whitespace-trimmed.
    pub stdout: String,
    /// Standard error, whitespace-trimmed.
    pub stderr: String,
}

impl ExecResult {
    /// A successful result carrying `stdout`.
    pub fn success_with(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed result carrying `stderr`.
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output (stdout + stderr) for error messages.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Executes external programs.
///
/// A non-zero exit is reported through [`ExecResult`], not as an error, so
/// callers can inspect stdout/stderr and decide. `Err` is reserved for
/// failures to run the program at all.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn exec(&self, program: &str, args: &[String]) -> CommandResult<ExecResult>;
}

/// Runs commands as real subprocesses with a bounded timeout.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(DEFAULT_EXEC_TIMEOUT)
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn exec(&self, program: &str, args: &[String]) -> CommandResult<ExecResult> {
        tracing::debug!(program = %program, args = %args.join(" "), "exec");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(output) => output.map_err(|e| CommandError::Spawn {
                program: program.to_string(),
                source: e,
            })?,
            Err(_) => {
                tracing::warn!(program = %program, timeout = ?self.timeout, "Command timed out");
                return Err(CommandError::Timeout {
                    program: program.to_string(),
                    args: args.join(" "),
                    timeout: self.timeout,
                });
            }
        };

        let result = ExecResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };

        if result.success() {
            tracing::trace!(program = %program, "Command succeeded");
        } else {
            tracing::debug!(
                program = %program,
                args = %args.join(" "),
                exit_code = result.exit_code,
                stderr = %result.stderr,
                "exec failed"
            );
        }

        Ok(result)
    }
}
