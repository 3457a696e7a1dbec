//! Test infrastructure for the OVN L2 plugin
//!
//! Provides:
//! - A scripted [`FakeRunner`] standing in for `ovn-nbctl`, `ovs-vsctl` and `ip`
//! - Fixtures for network configuration and CNI_ARGS
//! - Verification helpers over the captured invocations

pub mod fixtures;
mod runner;
mod verification;

pub use fixtures::*;
pub use runner::{FakeRunner, Invocation};
pub use verification::*;
