//! Error types for attach/detach operations.
//!
//! Every failure aborts the current call and is reported to the container
//! runtime verbatim; [`OvnL2Error::cni_code`] maps each kind onto the CNI
//! error code space.

use std::io;
use thiserror::Error;

use ovnl2_common::CommandError;

/// Result type alias for plugin operations.
pub type Result<T> = std::result::Result<T, OvnL2Error>;

/// CNI error codes used in the error object printed on failure.
pub mod cni_codes {
    /// Invalid necessary environment variables (CNI_ARGS and friends).
    pub const INVALID_ENVIRONMENT: u32 = 4;
    /// I/O failure.
    pub const IO_FAILURE: u32 = 5;
    /// Invalid network config.
    pub const INVALID_NETWORK_CONFIG: u32 = 7;
    /// Try again later.
    pub const TRY_AGAIN_LATER: u32 = 11;
    /// Plugin-specific failure.
    pub const INTERNAL: u32 = 999;
}

/// Errors raised while attaching or detaching a workload.
#[derive(Debug, Error)]
pub enum OvnL2Error {
    /// Malformed network name, subnet or MAC; TLS/scheme mismatch in the
    /// persisted configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Missing workload namespace or name.
    #[error("identity error: {0}")]
    Identity(String),

    /// Missing or unusable call-context variable.
    #[error("{0}")]
    Environment(String),

    /// Static/dynamic mix, IP outside the subnet, static IP without subnet.
    #[error("address error: {0}")]
    Address(String),

    /// Malformed address read back from the logical switch store.
    #[error("failed to parse addresses {output:?} for port {port}: {message}")]
    Parse {
        port: String,
        output: String,
        message: String,
    },

    /// Non-zero exit or transport failure of an external binary.
    #[error("{context}: {source}")]
    Command {
        context: String,
        #[source]
        source: CommandError,
    },

    /// Namespace or link manipulation failure.
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Namespace and link manipulation failures.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link {name:?} not found")]
    NotFound { name: String },

    #[error("link {name:?} already exists")]
    AlreadyExists { name: String },

    #[error("invalid hardware address {address:?}: {reason}")]
    InvalidHardwareAddress { address: String, reason: String },

    #[error("failed to add IP addr {address} to {name:?}: {message}")]
    AddressConflict {
        name: String,
        address: String,
        message: String,
    },

    #[error("network namespace {path:?}: {message}")]
    Namespace { path: String, message: String },

    #[error("failed to {operation} {name:?}: {message}")]
    Failed {
        operation: String,
        name: String,
        message: String,
    },
}

impl OvnL2Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn identity(message: impl Into<String>) -> Self {
        Self::Identity(message.into())
    }

    pub fn environment(message: impl Into<String>) -> Self {
        Self::Environment(message.into())
    }

    pub fn address(message: impl Into<String>) -> Self {
        Self::Address(message.into())
    }

    /// Wraps a command failure with what was being attempted.
    pub fn command(context: impl Into<String>, source: CommandError) -> Self {
        Self::Command {
            context: context.into(),
            source,
        }
    }

    /// CNI error code for this failure.
    pub fn cni_code(&self) -> u32 {
        match self {
            OvnL2Error::Config(_) => cni_codes::INVALID_NETWORK_CONFIG,
            OvnL2Error::Identity(_) | OvnL2Error::Environment(_) => {
                cni_codes::INVALID_ENVIRONMENT
            }
            OvnL2Error::Address(_) => cni_codes::INVALID_NETWORK_CONFIG,
            OvnL2Error::Io(_) => cni_codes::IO_FAILURE,
            OvnL2Error::Command { source, .. } if source.is_connection_refused() => {
                cni_codes::TRY_AGAIN_LATER
            }
            OvnL2Error::Command {
                source: CommandError::Timeout { .. },
                ..
            } => cni_codes::TRY_AGAIN_LATER,
            _ => cni_codes::INTERNAL,
        }
    }

    /// Returns true for link-not-found, which detach treats as success.
    pub fn is_link_not_found(&self) -> bool {
        matches!(self, OvnL2Error::Link(LinkError::NotFound { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovnl2_common::ExecResult;

    #[test]
    fn test_error_display() {
        let err = OvnL2Error::config("a network name is required");
        assert_eq!(err.to_string(), "configuration error: a network name is required");

        let err = OvnL2Error::from(LinkError::NotFound {
            name: "eth0".to_string(),
        });
        assert_eq!(err.to_string(), "link \"eth0\" not found");
        assert!(err.is_link_not_found());
    }

    #[test]
    fn test_cni_codes() {
        assert_eq!(OvnL2Error::config("x").cni_code(), 7);
        assert_eq!(OvnL2Error::identity("x").cni_code(), 4);
        assert_eq!(OvnL2Error::environment("x").cni_code(), 4);
        assert_eq!(OvnL2Error::address("x").cni_code(), 7);

        let refused = CommandError::failed(
            "ovn-nbctl",
            &[],
            &ExecResult::failure(1, "database connection failed (Connection refused)"),
        );
        assert_eq!(OvnL2Error::command("ls-add", refused).cni_code(), 11);

        let other = CommandError::failed("ovs-vsctl", &[], &ExecResult::failure(1, "no bridge"));
        assert_eq!(OvnL2Error::command("add-port", other).cni_code(), 999);
    }
}
