//! Persisted plugin configuration.
//!
//! Loads the control-plane connection from a TOML file.
//! Default location: /etc/ovn-l2.conf
//!
//! ```toml
//! [ovn]
//! ovs-bridge = "br-int"
//! address = "ssl:192.168.1.2:6641"
//! privkey = "/etc/ovn/ovn-privkey.pem"
//! cert = "/etc/ovn/ovn-cert.pem"
//! cacert = "/etc/ovn/ovnnb-ca.cert"
//!
//! [exec]
//! timeout-secs = 15
//! retry-attempts = 200
//! retry-interval-secs = 2
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use ovnl2_common::RetryPolicy;

use crate::error::{OvnL2Error, Result};

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ovn-l2.conf";

/// Slack between the clients' own `--timeout` and the subprocess kill bound.
pub const EXEC_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Integration bridge used when the file does not name one.
pub const DEFAULT_OVS_BRIDGE: &str = "br-int";

/// `[ovn]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OvnSection {
    #[serde(default)]
    pub ovs_bridge: String,

    /// Northbound database address, e.g. "ssl:192.168.1.2:6641".
    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub privkey: String,

    #[serde(default)]
    pub cert: String,

    #[serde(default)]
    pub cacert: String,
}

/// `[exec]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecSection {
    /// Passed to the control-plane clients as `--timeout`.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection-refused retries for the northbound client.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_retry_attempts() -> u32 {
    ovnl2_common::retry::DEFAULT_RETRY_ATTEMPTS
}

fn default_retry_interval_secs() -> u64 {
    2
}

impl Default for ExecSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_interval_secs: default_retry_interval_secs(),
        }
    }
}

/// How the northbound client reaches its database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionScheme {
    /// Local socket; the client's defaults apply.
    Unix,
    Tcp,
    Ssl,
}

/// Complete plugin configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OvnConfig {
    #[serde(default)]
    pub ovn: OvnSection,

    #[serde(default)]
    pub exec: ExecSection,
}

impl OvnConfig {
    /// Loads and validates the configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            OvnL2Error::config(format!("failed to open config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            OvnL2Error::Config(msg) => {
                OvnL2Error::config(format!("config file {}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Parses, applies defaults and validates.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: OvnConfig = toml::from_str(content)
            .map_err(|e| OvnL2Error::config(format!("failed to parse config: {}", e)))?;
        if config.ovn.ovs_bridge.is_empty() {
            config.ovn.ovs_bridge = DEFAULT_OVS_BRIDGE.to_string();
        }
        config.validate()?;
        Ok(config)
    }

    /// Connection scheme derived from the address prefix.
    pub fn scheme(&self) -> Result<ConnectionScheme> {
        let address = self.ovn.address.as_str();
        if address.is_empty() || address.starts_with("unix") {
            Ok(ConnectionScheme::Unix)
        } else if address.starts_with("tcp") {
            Ok(ConnectionScheme::Tcp)
        } else if address.starts_with("ssl") {
            Ok(ConnectionScheme::Ssl)
        } else {
            Err(OvnL2Error::config(format!(
                "unknown scheme in address {:?}",
                address
            )))
        }
    }

    /// Rejects TLS material on plain schemes and missing files on `ssl`.
    pub fn validate(&self) -> Result<()> {
        match self.scheme()? {
            ConnectionScheme::Unix | ConnectionScheme::Tcp => {
                if !self.ovn.privkey.is_empty()
                    || !self.ovn.cert.is_empty()
                    || !self.ovn.cacert.is_empty()
                {
                    return Err(OvnL2Error::config(
                        "certificate or key given; perhaps you mean to use the 'ssl' scheme?",
                    ));
                }
            }
            ConnectionScheme::Ssl => {
                for (what, path) in [
                    ("private key", &self.ovn.privkey),
                    ("certificate", &self.ovn.cert),
                    ("CA certificate", &self.ovn.cacert),
                ] {
                    if path.is_empty() || !Path::new(path).exists() {
                        return Err(OvnL2Error::config(format!(
                            "{} file {:?} not found",
                            what, path
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Connection flags for `ovn-nbctl`.
    pub fn nbctl_connection_args(&self) -> Vec<String> {
        match self.scheme() {
            Ok(ConnectionScheme::Ssl) => vec![
                format!("--private-key={}", self.ovn.privkey),
                format!("--certificate={}", self.ovn.cert),
                format!("--bootstrap-ca-cert={}", self.ovn.cacert),
                format!("--db={}", self.ovn.address),
            ],
            Ok(ConnectionScheme::Tcp) => vec![format!("--db={}", self.ovn.address)],
            _ => Vec::new(),
        }
    }

    pub fn ovs_bridge(&self) -> &str {
        &self.ovn.ovs_bridge
    }

    /// `--timeout` value for the control-plane clients.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.exec.timeout_secs)
    }

    /// Wall-clock bound on a single subprocess.
    ///
    /// Longer than [`Self::command_timeout`] so the clients report their own
    /// timeout before the process is killed.
    pub fn exec_timeout(&self) -> Duration {
        self.command_timeout() + EXEC_TIMEOUT_MARGIN
    }

    /// Retry budget for the northbound client.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.exec.retry_attempts,
            Duration::from_secs(self.exec.retry_interval_secs),
        )
    }
}
