//! Result objects printed to the container runtime.

use std::error::Error as _;
use std::net::IpAddr;

use serde::Serialize;

use ovnl2_types::{IpPrefix, MacAddress};

use crate::error::OvnL2Error;
use crate::netconf::SUPPORTED_VERSIONS;

/// Index of the container-side interface in [`CniResult::interfaces`].
pub const CONTAINER_INTERFACE_INDEX: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interface {
    pub name: String,
    pub mac: MacAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<String>,
}

impl Interface {
    pub fn host(name: impl Into<String>, mac: MacAddress) -> Self {
        Self {
            name: name.into(),
            mac,
            sandbox: None,
        }
    }

    pub fn container(name: impl Into<String>, mac: MacAddress, sandbox: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mac,
            sandbox: Some(sandbox.into()),
        }
    }
}

/// Host and container ends of a veth pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VethPair {
    pub host: Interface,
    pub container: Interface,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpConfig {
    /// "4" or "6"; only emitted for 0.3.x results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub interface: usize,
    pub address: IpPrefix,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CniResult {
    #[serde(rename = "cniVersion")]
    pub cni_version: String,
    pub interfaces: Vec<Interface>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ips: Vec<IpConfig>,
}

impl CniResult {
    /// Builds the attach result: host interface first, container second,
    /// and the container address if one was assigned.
    pub fn assemble(
        cni_version: &str,
        veth: VethPair,
        address: Option<IpPrefix>,
        gateway: Option<IpAddr>,
    ) -> Self {
        let legacy = cni_version.starts_with("0.3.");
        let ips = address
            .map(|address| IpConfig {
                version: legacy.then(|| if address.is_ipv4() { "4" } else { "6" }.to_string()),
                interface: CONTAINER_INTERFACE_INDEX,
                address,
                gateway,
            })
            .into_iter()
            .collect();

        Self {
            cni_version: cni_version.to_string(),
            interfaces: vec![veth.host, veth.container],
            ips,
        }
    }
}

/// Reply to `VERSION`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionResult {
    #[serde(rename = "cniVersion")]
    pub cni_version: String,
    #[serde(rename = "supportedVersions")]
    pub supported_versions: Vec<String>,
}

impl VersionResult {
    pub fn new(cni_version: &str) -> Self {
        Self {
            cni_version: cni_version.to_string(),
            supported_versions: SUPPORTED_VERSIONS.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Error object printed on failure.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResult {
    #[serde(rename = "cniVersion")]
    pub cni_version: String,
    pub code: u32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResult {
    pub fn new(cni_version: &str, code: u32, msg: impl Into<String>) -> Self {
        Self {
            cni_version: cni_version.to_string(),
            code,
            msg: msg.into(),
            details: None,
        }
    }

    /// Error object for a plugin failure, with the cause chain as details.
    pub fn from_error(cni_version: &str, err: &OvnL2Error) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            details: (!causes.is_empty()).then(|| causes.join(": ")),
            ..Self::new(cni_version, err.cni_code(), err.to_string())
        }
    }
}
