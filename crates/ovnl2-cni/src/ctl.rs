//! Control-plane client wrappers.
//!
//! [`Nbctl`] talks to the northbound database with the configured
//! connection flags and retries while the server refuses connections.
//! [`Vsctl`] talks to the local switch database with a timeout only.

use std::time::Duration;

use ovnl2_common::shell::{OVN_NBCTL_CMD, OVS_VSCTL_CMD};
use ovnl2_common::{exec_with_retry, CommandError, CommandRunner, RetryPolicy};

use crate::config::OvnConfig;
use crate::error::{OvnL2Error, Result};

fn timeout_flag(timeout: Duration) -> String {
    format!("--timeout={}", timeout.as_secs())
}

/// `ovn-nbctl` client.
pub struct Nbctl<'a, R: ?Sized> {
    runner: &'a R,
    connection: Vec<String>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl<'a, R: CommandRunner + ?Sized> Nbctl<'a, R> {
    pub fn new(runner: &'a R, config: &OvnConfig) -> Self {
        Self::with_settings(
            runner,
            config.nbctl_connection_args(),
            config.command_timeout(),
            config.retry_policy(),
        )
    }

    pub fn with_settings(
        runner: &'a R,
        connection: Vec<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            runner,
            connection,
            timeout,
            retry,
        }
    }

    /// Runs a command and returns stdout with surrounding quotes removed.
    ///
    /// `context` names the operation in the error on failure.
    pub async fn run(&self, context: &str, args: Vec<String>) -> Result<String> {
        let mut full = self.connection.clone();
        full.push(timeout_flag(self.timeout));
        full.extend(args);

        let result = exec_with_retry(self.runner, OVN_NBCTL_CMD, &full, &self.retry)
            .await
            .map_err(|e| OvnL2Error::command(context, e))?;
        if !result.success() {
            return Err(OvnL2Error::command(
                context,
                CommandError::failed(OVN_NBCTL_CMD, &full, &result),
            ));
        }
        Ok(result.stdout.trim_matches('"').to_string())
    }
}

/// `ovs-vsctl` client.
pub struct Vsctl<'a, R: ?Sized> {
    runner: &'a R,
    timeout: Duration,
}

impl<'a, R: CommandRunner + ?Sized> Vsctl<'a, R> {
    pub fn new(runner: &'a R, config: &OvnConfig) -> Self {
        Self::with_timeout(runner, config.command_timeout())
    }

    pub fn with_timeout(runner: &'a R, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    pub async fn run(&self, context: &str, args: Vec<String>) -> Result<String> {
        let mut full = vec![timeout_flag(self.timeout)];
        full.extend(args);

        let result = self
            .runner
            .exec(OVS_VSCTL_CMD, &full)
            .await
            .map_err(|e| OvnL2Error::command(context, e))?;
        if !result.success() {
            return Err(OvnL2Error::command(
                context,
                CommandError::failed(OVS_VSCTL_CMD, &full, &result),
            ));
        }
        Ok(result.stdout.trim_matches('"').to_string())
    }
}
