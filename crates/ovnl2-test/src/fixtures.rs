//! Test fixtures for common plugin inputs and control-plane replies

use ovnl2_common::ExecResult;
use serde_json::json;

/// CNI version used by the fixtures
pub const FIXTURE_CNI_VERSION: &str = "1.0.0";

/// Network configuration as it arrives on stdin
pub fn net_conf(name: &str, subnet: Option<&str>) -> Vec<u8> {
    let mut conf = json!({
        "cniVersion": FIXTURE_CNI_VERSION,
        "name": name,
        "type": "ovn-l2",
        "mtu": 1400,
    });
    if let Some(subnet) = subnet {
        conf["subnet"] = json!(subnet);
    }
    serde_json::to_vec(&conf).unwrap_or_default()
}

/// Builder for the `CNI_ARGS` environment string
#[derive(Debug, Clone, Default)]
pub struct CniArgsBuilder {
    pairs: Vec<(String, String)>,
}

impl CniArgsBuilder {
    /// Args for a Kubernetes pod, with `IgnoreUnknown` set as kubelet does
    pub fn pod(namespace: &str, name: &str) -> Self {
        Self::default()
            .with("IgnoreUnknown", "1")
            .with("K8S_POD_NAMESPACE", namespace)
            .with("K8S_POD_NAME", name)
    }

    /// Append an arbitrary key/value pair
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// Request a static MAC
    pub fn with_mac(self, mac: &str) -> Self {
        self.with("MAC", mac)
    }

    /// Request a static IP
    pub fn with_ip(self, ip: &str) -> Self {
        self.with("IP", ip)
    }

    /// Render as `K=V;K=V`
    pub fn build(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// `ovn-nbctl get logical_switch_port <port> dynamic_addresses` output
pub fn dynamic_addresses_reply(mac: &str, ip: &str) -> ExecResult {
    ExecResult::success_with(format!("\"{} {}\"", mac, ip))
}

/// `ovn-nbctl get logical_switch_port <port> addresses` output
pub fn static_addresses_reply(addresses: &str) -> ExecResult {
    ExecResult::success_with(format!("[\"{}\"]", addresses))
}

/// Output for a column holding no addresses
pub fn empty_addresses_reply() -> ExecResult {
    ExecResult::success_with("[]")
}

/// `ip -j link show <dev>` output for a single link
pub fn ip_link_json_reply(name: &str, mac: &str) -> ExecResult {
    let links = json!([{ "ifindex": 7, "ifname": name, "address": mac, "operstate": "UP" }]);
    ExecResult::success_with(links.to_string())
}

/// stderr of the northbound client when the database is not listening
pub fn connection_refused_reply() -> ExecResult {
    ExecResult::failure(
        1,
        "ovn-nbctl: unix:/var/run/ovn/ovnnb_db.sock: database connection failed (Connection refused)",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cni_args_builder() {
        let args = CniArgsBuilder::pod("default", "web-0")
            .with_mac("0a:00:00:00:00:01")
            .build();
        assert_eq!(
            args,
            "IgnoreUnknown=1;K8S_POD_NAMESPACE=default;K8S_POD_NAME=web-0;MAC=0a:00:00:00:00:01"
        );
    }

    #[test]
    fn test_net_conf_without_subnet() {
        let conf: serde_json::Value = serde_json::from_slice(&net_conf("net1", None)).unwrap();
        assert_eq!(conf["name"], "net1");
        assert!(conf.get("subnet").is_none());
    }
}
