//! Polling retry for a control plane that is still coming up.
//!
//! The northbound database may not be listening yet when the first pod on a
//! node is attached. Commands whose stderr carries the "Connection refused"
//! signature are retried at a fixed interval until the budget runs out; any
//! other failure is returned to the caller at once.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::CommandResult;
use crate::shell::{CommandRunner, ExecResult};

/// Standard error signature of a refused database connection.
pub const CONNECTION_REFUSED: &str = "Connection refused";

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 200;

/// Default pause between attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Retry budget for connection-refused failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Sleep between attempts.
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_retries,
            interval,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_INTERVAL)
    }
}

/// Returns true if a failed result looks like the server is not up yet.
pub fn is_transient(result: &ExecResult) -> bool {
    !result.success() && result.stderr.contains(CONNECTION_REFUSED)
}

/// Executes a command, retrying while it fails with "Connection refused".
///
/// The last [`ExecResult`] is returned whether or not it succeeded; spawn
/// and timeout errors are never retried.
pub async fn exec_with_retry<R>(
    runner: &R,
    program: &str,
    args: &[String],
    policy: &RetryPolicy,
) -> CommandResult<ExecResult>
where
    R: CommandRunner + ?Sized,
{
    let mut retries_left = policy.max_retries;
    loop {
        let result = runner.exec(program, args).await?;
        if result.success() {
            return Ok(result);
        }

        if !is_transient(&result) {
            // Some other problem for the caller to handle
            return Ok(result);
        }

        if retries_left == 0 {
            warn!(
                program = %program,
                attempts = policy.max_retries + 1,
                "Giving up waiting for control plane connection"
            );
            return Ok(result);
        }

        retries_left -= 1;
        debug!(
            program = %program,
            retries_left = retries_left,
            "Connection refused, control plane may not be up yet"
        );
        tokio::time::sleep(policy.interval).await;
    }
}
