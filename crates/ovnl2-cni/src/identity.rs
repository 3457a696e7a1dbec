//! Workload identity from `CNI_ARGS`.
//!
//! kubelet passes `IgnoreUnknown=1;K8S_POD_NAMESPACE=..;K8S_POD_NAME=..;...`.
//! Callers may add `MAC=` and `IP=` to request a static address.

use std::collections::HashMap;
use std::net::IpAddr;

use ovnl2_types::MacAddress;

use crate::error::{OvnL2Error, Result};

pub const ARG_IGNORE_UNKNOWN: &str = "IgnoreUnknown";
pub const ARG_POD_NAMESPACE: &str = "K8S_POD_NAMESPACE";
pub const ARG_POD_NAME: &str = "K8S_POD_NAME";
pub const ARG_POD_INFRA_CONTAINER_ID: &str = "K8S_POD_INFRA_CONTAINER_ID";
pub const ARG_IP: &str = "IP";
pub const ARG_MAC: &str = "MAC";

const KNOWN_ARGS: &[&str] = &[
    ARG_IGNORE_UNKNOWN,
    ARG_POD_NAMESPACE,
    ARG_POD_NAME,
    ARG_POD_INFRA_CONTAINER_ID,
    ARG_IP,
    ARG_MAC,
];

/// The workload a port is provisioned for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadIdentity {
    /// Pod namespace, never empty.
    pub namespace: String,
    /// Pod name, never empty.
    pub name: String,
    /// Caller-requested MAC.
    pub mac: Option<MacAddress>,
    /// Caller-requested IP.
    pub ip: Option<IpAddr>,
}

impl WorkloadIdentity {
    /// Resolves the identity from a `CNI_ARGS` string.
    pub fn from_cni_args(args: &str) -> Result<Self> {
        let pairs = parse_cni_args(args)?;
        let get = |key: &str| pairs.get(key).map(String::as_str).filter(|v| !v.is_empty());

        let namespace = get(ARG_POD_NAMESPACE)
            .ok_or_else(|| OvnL2Error::identity(format!("missing {}", ARG_POD_NAMESPACE)))?
            .to_string();
        let name = get(ARG_POD_NAME)
            .ok_or_else(|| OvnL2Error::identity(format!("missing {}", ARG_POD_NAME)))?
            .to_string();

        let mac = get(ARG_MAC)
            .map(|mac| {
                mac.parse::<MacAddress>().map_err(|e| {
                    OvnL2Error::config(format!("failed to parse requested pod MAC {:?}: {}", mac, e))
                })
            })
            .transpose()?;

        let ip = get(ARG_IP)
            .map(|ip| {
                ip.parse::<IpAddr>()
                    .map_err(|_| OvnL2Error::config(format!("invalid pod IP {:?}", ip)))
            })
            .transpose()?;

        Ok(Self {
            namespace,
            name,
            mac,
            ip,
        })
    }
}

/// Splits `K=V;K=V` into a map, rejecting unknown keys unless
/// `IgnoreUnknown` is set.
pub fn parse_cni_args(args: &str) -> Result<HashMap<String, String>> {
    let mut pairs = HashMap::new();
    for item in args.split(';').filter(|item| !item.is_empty()) {
        let (key, value) = item
            .split_once('=')
            .ok_or_else(|| OvnL2Error::config(format!("ARGS: invalid pair {:?}", item)))?;
        pairs.insert(key.to_string(), value.to_string());
    }

    let ignore_unknown = pairs
        .get(ARG_IGNORE_UNKNOWN)
        .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true"));
    if !ignore_unknown {
        if let Some(unknown) = pairs.keys().find(|k| !KNOWN_ARGS.contains(&k.as_str())) {
            return Err(OvnL2Error::config(format!(
                "ARGS: unknown args {:?}",
                unknown
            )));
        }
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pod_identity() {
        let id = WorkloadIdentity::from_cni_args(
            "IgnoreUnknown=1;K8S_POD_NAMESPACE=default;K8S_POD_NAME=web-0;K8S_POD_INFRA_CONTAINER_ID=abc",
        )
        .unwrap();
        assert_eq!(id.namespace, "default");
        assert_eq!(id.name, "web-0");
        assert!(id.mac.is_none());
        assert!(id.ip.is_none());
    }

    #[test]
    fn test_requested_mac_and_ip() {
        let id = WorkloadIdentity::from_cni_args(
            "K8S_POD_NAMESPACE=ns;K8S_POD_NAME=p;MAC=0a:00:00:00:00:01;IP=10.0.0.5",
        )
        .unwrap();
        assert_eq!(id.mac.unwrap().to_string(), "0a:00:00:00:00:01");
        assert_eq!(id.ip.unwrap().to_string(), "10.0.0.5");
    }

    #[test]
    fn test_missing_namespace_is_identity_error() {
        let err = WorkloadIdentity::from_cni_args("K8S_POD_NAME=p").unwrap_err();
        assert!(matches!(err, OvnL2Error::Identity(_)));
        assert!(err.to_string().contains("K8S_POD_NAMESPACE"));
    }

    #[test]
    fn test_empty_name_is_identity_error() {
        let err = WorkloadIdentity::from_cni_args("K8S_POD_NAMESPACE=ns;K8S_POD_NAME=").unwrap_err();
        assert!(matches!(err, OvnL2Error::Identity(_)));
    }

    #[test]
    fn test_bad_mac_is_config_error() {
        let err = WorkloadIdentity::from_cni_args("K8S_POD_NAMESPACE=ns;K8S_POD_NAME=p;MAC=zz:00")
            .unwrap_err();
        assert!(matches!(err, OvnL2Error::Config(_)));
    }

    #[test]
    fn test_unknown_args_rejected_without_ignore_unknown() {
        let err = parse_cni_args("K8S_POD_NAMESPACE=ns;FOO=bar").unwrap_err();
        assert!(matches!(err, OvnL2Error::Config(_)));

        let pairs = parse_cni_args("IgnoreUnknown=true;FOO=bar").unwrap();
        assert_eq!(pairs.get("FOO").map(String::as_str), Some("bar"));
    }

    #[test]
    fn test_malformed_pair() {
        assert!(parse_cni_args("K8S_POD_NAMESPACE").is_err());
        assert!(parse_cni_args("").unwrap().is_empty());
    }
}
