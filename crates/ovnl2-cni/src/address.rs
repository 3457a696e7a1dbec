//! Port address requests and read-back.
//!
//! The logical switch store encodes port addresses two ways:
//!
//! - `addresses` (static): `["0a:00:00:00:00:01 10.0.0.5"]`
//! - `dynamic_addresses`: `"0a:00:00:00:00:01 10.0.0.5"`
//!
//! Both carry one or two space-separated tokens, MAC then optional IP.
//! `[]` means the column is empty.

use std::fmt;
use std::net::IpAddr;

use ovnl2_types::{IpPrefix, MacAddress};

use crate::error::{OvnL2Error, Result};

/// Prefix for generated port MACs (locally administered, unicast).
pub const GENERATED_MAC_PREFIX: [u8; 3] = [0x0a, 0x00, 0x00];

/// Marker asking the store to allocate MAC and IP from the switch subnet.
pub const DYNAMIC_MARKER: &str = "dynamic";

/// What to ask the store for when creating a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressRequest {
    /// Store-assigned MAC and IP from the switch pool.
    Dynamic,
    /// Caller-fixed MAC, with an IP only on subnetted switches.
    Static { mac: MacAddress, ip: Option<IpAddr> },
}

impl AddressRequest {
    /// Applies the static/dynamic policy to a caller request.
    ///
    /// With a subnet, MAC and IP must be given together or not at all, and
    /// the IP must fall inside the subnet. Without one, an IP is refused and
    /// a missing MAC is generated.
    pub fn resolve(
        subnet: Option<&IpPrefix>,
        mac: Option<MacAddress>,
        ip: Option<IpAddr>,
    ) -> Result<Self> {
        match subnet {
            Some(subnet) => {
                if let Some(ip) = ip {
                    if !subnet.contains(ip) {
                        return Err(OvnL2Error::address(format!(
                            "switch subnet {} does not contain requested pod IP {}",
                            subnet, ip
                        )));
                    }
                }
                match (mac, ip) {
                    (Some(mac), Some(ip)) => Ok(Self::Static { mac, ip: Some(ip) }),
                    (None, None) => Ok(Self::Dynamic),
                    (mac, ip) => Err(mixed_request(mac, ip)),
                }
            }
            None => {
                if ip.is_some() {
                    return Err(OvnL2Error::address("static IP requires a subnet"));
                }
                let mac = mac.unwrap_or_else(|| MacAddress::random_with_prefix(GENERATED_MAC_PREFIX));
                Ok(Self::Static { mac, ip: None })
            }
        }
    }

    /// Checks an already-built request against the switch it targets.
    pub fn validate_for(&self, subnet: Option<&IpPrefix>) -> Result<()> {
        match (self, subnet) {
            (Self::Dynamic, Some(_)) => Ok(()),
            (Self::Dynamic, None) => Err(OvnL2Error::address(
                "dynamic addressing requires a switch subnet",
            )),
            (Self::Static { mac, ip }, Some(subnet)) => {
                let ip = ip.ok_or_else(|| mixed_request(Some(*mac), None))?;
                if subnet.contains(ip) {
                    Ok(())
                } else {
                    Err(OvnL2Error::address(format!(
                        "switch subnet {} does not contain requested pod IP {}",
                        subnet, ip
                    )))
                }
            }
            (Self::Static { ip: Some(_), .. }, None) => {
                Err(OvnL2Error::address("static IP requires a subnet"))
            }
            (Self::Static { ip: None, .. }, None) => Ok(()),
        }
    }

    /// Static requests are read back from `addresses`, dynamic ones from
    /// `dynamic_addresses`.
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static { .. })
    }

    /// Value passed to `lsp-set-addresses`.
    pub fn to_lsp_addresses(&self) -> String {
        match self {
            Self::Dynamic => DYNAMIC_MARKER.to_string(),
            Self::Static { mac, ip: Some(ip) } => format!("{} {}", mac, ip),
            Self::Static { mac, ip: None } => mac.to_string(),
        }
    }
}

fn mixed_request(mac: Option<MacAddress>, ip: Option<IpAddr>) -> OvnL2Error {
    let show = |v: Option<String>| v.unwrap_or_else(|| "<none>".to_string());
    OvnL2Error::address(format!(
        "cannot mix static/dynamic MAC ({}) and IP ({})",
        show(mac.map(|m| m.to_string())),
        show(ip.map(|i| i.to_string()))
    ))
}

/// Address resolved for a port after creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortAddress {
    pub mac: Option<MacAddress>,
    pub ip: Option<IpAddr>,
}

impl PortAddress {
    pub fn is_empty(&self) -> bool {
        self.mac.is_none() && self.ip.is_none()
    }
}

impl fmt::Display for PortAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.mac, self.ip) {
            (Some(mac), Some(ip)) => write!(f, "{} {}", mac, ip),
            (Some(mac), None) => write!(f, "{}", mac),
            _ => write!(f, "[]"),
        }
    }
}

/// Parses an address column read back for `port`.
pub fn parse_port_addresses(port: &str, output: &str) -> Result<PortAddress> {
    let parse_err = |message: String| OvnL2Error::Parse {
        port: port.to_string(),
        output: output.to_string(),
        message,
    };

    let trimmed = output.trim();
    if trimmed == "[]" {
        return Ok(PortAddress::default());
    }

    let inner = strip_layer(trimmed, '[', ']');
    let inner = strip_layer(inner, '"', '"');

    let tokens: Vec<&str> = inner.split(' ').collect();
    if tokens.is_empty() || tokens.len() > 2 {
        return Err(parse_err(format!("expected MAC [IP], got {} tokens", tokens.len())));
    }

    let mac = tokens[0]
        .parse::<MacAddress>()
        .map_err(|e| parse_err(format!("invalid MAC {:?}: {}", tokens[0], e)))?;
    let ip = match tokens.get(1) {
        Some(ip) => Some(
            ip.parse::<IpAddr>()
                .map_err(|_| parse_err(format!("invalid IP {:?}", ip)))?,
        ),
        None => None,
    };

    Ok(PortAddress { mac: Some(mac), ip })
}

fn strip_layer(s: &str, open: char, close: char) -> &str {
    s.strip_prefix(open)
        .and_then(|rest| rest.strip_suffix(close))
        .unwrap_or(s)
}
