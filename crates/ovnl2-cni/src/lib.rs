//! ovn-l2 - CNI plugin attaching workload namespaces to OVN logical switches
//!
//! Attach creates (idempotently) a logical switch for the network and a
//! logical port for the workload, reads back the port's address, wires a
//! veth pair into the workload namespace and binds the host end to the
//! integration bridge. Detach removes the container link.

pub mod address;
pub mod bridge;
pub mod commands;
pub mod config;
pub mod ctl;
pub mod error;
pub mod identity;
pub mod link;
pub mod naming;
pub mod netconf;
pub mod netns;
pub mod plugin;
pub mod provisioner;
pub mod result;
pub mod skel;
pub mod veth;

pub use address::{parse_port_addresses, AddressRequest, PortAddress};
pub use bridge::BridgeBinder;
pub use config::OvnConfig;
pub use error::{LinkError, OvnL2Error, Result};
pub use identity::WorkloadIdentity;
pub use netconf::NetworkConfig;
pub use netns::NetNs;
pub use plugin::{OvnL2Plugin, ProvisionedPort};
pub use provisioner::LogicalNetworkProvisioner;
pub use result::{CniResult, ErrorResult, Interface, VersionResult, VethPair};
pub use skel::{CmdArgs, CniCommand};
pub use veth::NamespaceWirer;
