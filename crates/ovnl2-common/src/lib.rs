//! Command execution layer for the OVN L2 plugin.
//!
//! Every interaction with `ovn-nbctl`, `ovs-vsctl` and `ip` goes through the
//! [`CommandRunner`] seam:
//!
//! - [`shell`]: the runner trait, the subprocess implementation with a
//!   bounded timeout, and the captured [`ExecResult`]
//! - [`retry`]: the "Connection refused" polling loop used for the
//!   northbound database client while the control plane is starting
//! - [`error`]: error types for spawn/timeout/non-zero exit
//!
//! # Example
//!
//! ```ignore
//! use ovnl2_common::{retry, shell::{self, SystemRunner, OVN_NBCTL_CMD}};
//!
//! let runner = SystemRunner::default();
//! let args = vec!["--may-exist".to_string(), "ls-add".to_string(), "ovnl2_net1".to_string()];
//! let result = retry::exec_with_retry(&runner, OVN_NBCTL_CMD, &args, &Default::default()).await?;
//! ```

pub mod error;
pub mod retry;
pub mod shell;

pub use error::{CommandError, CommandResult};
pub use retry::{exec_with_retry, RetryPolicy};
pub use shell::{CommandRunner, ExecResult, SystemRunner};
