//! Typed network primitives shared by the OVN L2 plugin crates.
//!
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses, including random
//!   generation under a fixed three-octet prefix
//! - [`IpPrefix`]: IPv4/IPv6 prefixes in CIDR notation with the
//!   network/gateway arithmetic needed for logical switch subnets

mod ip;
mod mac;

pub use ip::{next_ip, IpPrefix};
pub use mac::MacAddress;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IP prefix format: {0}")]
    InvalidIpPrefix(String),
}
