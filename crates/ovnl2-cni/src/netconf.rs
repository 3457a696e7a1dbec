//! Network configuration passed on stdin.

use serde::Deserialize;

use ovnl2_types::IpPrefix;

use crate::error::{OvnL2Error, Result};

/// CNI versions whose result format this plugin can produce.
pub const SUPPORTED_VERSIONS: &[&str] = &["0.3.0", "0.3.1", "0.4.0", "1.0.0"];

/// Version assumed when the configuration does not name one.
pub const DEFAULT_CNI_VERSION: &str = "0.3.1";

/// Raw network configuration as decoded from JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetConf {
    #[serde(rename = "cniVersion", default)]
    pub cni_version: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub plugin_type: String,
    #[serde(default)]
    pub mtu: u32,
    #[serde(default)]
    pub subnet: String,
}

/// CNI version the caller asked for, read leniently.
///
/// Used for replies that precede validation: VERSION, where stdin carries
/// only `cniVersion`, and error reports.
pub fn requested_version(bytes: &[u8]) -> String {
    serde_json::from_slice::<NetConf>(bytes)
        .ok()
        .map(|conf| conf.cni_version)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_CNI_VERSION.to_string())
}

/// Validated network configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub cni_version: String,
    /// Logical network name, never empty.
    pub name: String,
    /// Link MTU; 0 leaves the kernel default.
    pub mtu: u32,
    /// Switch subnet, normalised to its network address.
    pub subnet: Option<IpPrefix>,
}

impl NetworkConfig {
    /// Decodes and validates the stdin payload.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let raw: NetConf = serde_json::from_slice(bytes)
            .map_err(|e| OvnL2Error::config(format!("failed to load netconf: {}", e)))?;
        Self::try_from(raw)
    }

    /// Returns true when the switch carries a subnet for dynamic addressing.
    pub fn has_subnet(&self) -> bool {
        self.subnet.is_some()
    }
}

impl TryFrom<NetConf> for NetworkConfig {
    type Error = OvnL2Error;

    fn try_from(raw: NetConf) -> Result<Self> {
        if raw.name.is_empty() {
            return Err(OvnL2Error::config("a network name is required"));
        }

        let cni_version = if raw.cni_version.is_empty() {
            DEFAULT_CNI_VERSION.to_string()
        } else if SUPPORTED_VERSIONS.contains(&raw.cni_version.as_str()) {
            raw.cni_version
        } else {
            return Err(OvnL2Error::config(format!(
                "unsupported CNI version {:?}",
                raw.cni_version
            )));
        };

        let subnet = if raw.subnet.is_empty() {
            None
        } else {
            let prefix: IpPrefix = raw.subnet.parse().map_err(|e| {
                OvnL2Error::config(format!("failed to parse subnet {:?}: {}", raw.subnet, e))
            })?;
            Some(prefix.network())
        };

        Ok(Self {
            cni_version,
            name: raw.name,
            mtu: raw.mtu,
            subnet,
        })
    }
}
