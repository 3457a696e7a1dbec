//! Argument builders for `ovn-nbctl`, `ovs-vsctl` and `ip`.
//!
//! Builders return argument vectors without the program name or the
//! connection/timeout flags; those are prepended by [`crate::ctl`].

use std::net::IpAddr;

use ovnl2_types::{IpPrefix, MacAddress};

use crate::address::AddressRequest;

/// Column holding caller-fixed addresses.
pub const ADDRESSES_COLUMN: &str = "addresses";

/// Column holding store-allocated addresses.
pub const DYNAMIC_ADDRESSES_COLUMN: &str = "dynamic_addresses";

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Build logical switch creation, with subnet and gateway exclusion when
/// the network declares a subnet.
pub fn build_ls_add_args(switch: &str, subnet: Option<(&IpPrefix, IpAddr)>) -> Vec<String> {
    let mut out = args(&["--may-exist", "ls-add", switch]);
    if let Some((subnet, gateway)) = subnet {
        out.extend(args(&["--", "set", "logical_switch", switch]));
        out.push(format!("other-config:subnet={}", subnet));
        out.extend(args(&["--", "set", "logical_switch", switch]));
        out.push(format!("other-config:exclude_ips={}", gateway));
    }
    out
}

/// Build logical port creation.
///
/// Waits for the southbound database so the addresses can be read back
/// immediately. On subnetted switches any stale dynamic allocation is
/// cleared first.
pub fn build_lsp_add_args(
    switch: &str,
    port: &str,
    request: &AddressRequest,
    subnetted: bool,
) -> Vec<String> {
    let mut out = args(&["--wait=sb", "--may-exist", "lsp-add", switch, port]);
    if subnetted {
        out.extend(args(&[
            "--",
            "--if-exists",
            "clear",
            "logical_switch_port",
            port,
            DYNAMIC_ADDRESSES_COLUMN,
        ]));
    }
    out.extend(args(&["--", "lsp-set-addresses", port]));
    out.push(request.to_lsp_addresses());
    out
}

/// Build address read-back for a port.
pub fn build_get_addresses_args(port: &str, is_static: bool) -> Vec<String> {
    let column = if is_static {
        ADDRESSES_COLUMN
    } else {
        DYNAMIC_ADDRESSES_COLUMN
    };
    args(&["get", "logical_switch_port", port, column])
}

/// Build host interface attachment to the integration bridge.
pub fn build_add_port_args(
    bridge: &str,
    host_iface: &str,
    mac: &MacAddress,
    port: &str,
) -> Vec<String> {
    let mut out = args(&[
        "--may-exist",
        "add-port",
        bridge,
        host_iface,
        "--",
        "set",
        "interface",
        host_iface,
    ]);
    out.push(format!("external_ids:attached_mac={}", mac));
    out.push(format!("external_ids:iface-id={}", port));
    out
}

/// Build veth pair creation with the peer moved to the namespace of `peer_netns_pid`.
pub fn build_veth_add_args(name: &str, peer: &str, mtu: u32, peer_netns_pid: u32) -> Vec<String> {
    let mut out = args(&["link", "add", name]);
    if mtu > 0 {
        out.extend(["mtu".to_string(), mtu.to_string()]);
    }
    out.extend(args(&["type", "veth", "peer", "name", peer]));
    if mtu > 0 {
        out.extend(["mtu".to_string(), mtu.to_string()]);
    }
    out.extend(["netns".to_string(), peer_netns_pid.to_string()]);
    out
}

/// Build link admin state change.
pub fn build_link_set_state_args(name: &str, up: bool) -> Vec<String> {
    args(&["link", "set", "dev", name, if up { "up" } else { "down" }])
}

/// Build link hardware address change.
pub fn build_link_set_address_args(name: &str, mac: &MacAddress) -> Vec<String> {
    let mut out = args(&["link", "set", "dev", name, "address"]);
    out.push(mac.to_string());
    out
}

/// Build address assignment.
pub fn build_addr_add_args(name: &str, address: &IpPrefix) -> Vec<String> {
    let mut out = args(&["addr", "add"]);
    out.push(address.to_string());
    out.extend(args(&["dev", name]));
    out
}

pub fn build_link_del_args(name: &str) -> Vec<String> {
    args(&["link", "del", "dev", name])
}

/// Build JSON link query.
pub fn build_link_show_args(name: &str) -> Vec<String> {
    args(&["-j", "link", "show", "dev", name])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(args: &[String]) -> String {
        args.join(" ")
    }

    #[test]
    fn test_build_ls_add_without_subnet() {
        assert_eq!(
            line(&build_ls_add_args("ovnl2_net1", None)),
            "--may-exist ls-add ovnl2_net1"
        );
    }

    #[test]
    fn test_build_ls_add_with_subnet() {
        let subnet: IpPrefix = "10.0.0.0/24".parse().unwrap();
        let gateway: IpAddr = "10.0.0.1".parse().unwrap();
        assert_eq!(
            line(&build_ls_add_args("ovnl2_net1", Some((&subnet, gateway)))),
            "--may-exist ls-add ovnl2_net1 \
             -- set logical_switch ovnl2_net1 other-config:subnet=10.0.0.0/24 \
             -- set logical_switch ovnl2_net1 other-config:exclude_ips=10.0.0.1"
        );
    }

    #[test]
    fn test_build_lsp_add_dynamic() {
        let cmd = build_lsp_add_args("ovnl2_net1", "ovnl2_ns_pod_net1", &AddressRequest::Dynamic, true);
        assert_eq!(
            line(&cmd),
            "--wait=sb --may-exist lsp-add ovnl2_net1 ovnl2_ns_pod_net1 \
             -- --if-exists clear logical_switch_port ovnl2_ns_pod_net1 dynamic_addresses \
             -- lsp-set-addresses ovnl2_ns_pod_net1 dynamic"
        );
    }

    #[test]
    fn test_build_lsp_add_static_pair_is_one_argument() {
        let request = AddressRequest::Static {
            mac: "0a:00:00:00:00:01".parse().unwrap(),
            ip: Some("10.0.0.5".parse().unwrap()),
        };
        let cmd = build_lsp_add_args("sw", "p", &request, true);
        assert_eq!(cmd.last().map(String::as_str), Some("0a:00:00:00:00:01 10.0.0.5"));
    }

    #[test]
    fn test_build_lsp_add_without_subnet() {
        let request = AddressRequest::Static {
            mac: "0a:00:00:00:00:02".parse().unwrap(),
            ip: None,
        };
        assert_eq!(
            line(&build_lsp_add_args("sw", "p", &request, false)),
            "--wait=sb --may-exist lsp-add sw p -- lsp-set-addresses p 0a:00:00:00:00:02"
        );
    }

    #[test]
    fn test_build_get_addresses() {
        assert_eq!(
            line(&build_get_addresses_args("p", true)),
            "get logical_switch_port p addresses"
        );
        assert_eq!(
            line(&build_get_addresses_args("p", false)),
            "get logical_switch_port p dynamic_addresses"
        );
    }

    #[test]
    fn test_build_add_port() {
        let mac: MacAddress = "0a:00:00:00:00:01".parse().unwrap();
        assert_eq!(
            line(&build_add_port_args("br-int", "veth1234abcd", &mac, "ovnl2_ns_pod_net1")),
            "--may-exist add-port br-int veth1234abcd -- set interface veth1234abcd \
             external_ids:attached_mac=0a:00:00:00:00:01 external_ids:iface-id=ovnl2_ns_pod_net1"
        );
    }

    #[test]
    fn test_build_veth_add() {
        assert_eq!(
            line(&build_veth_add_args("eth0", "veth0011aabb", 1400, 42)),
            "link add eth0 mtu 1400 type veth peer name veth0011aabb mtu 1400 netns 42"
        );
        assert_eq!(
            line(&build_veth_add_args("eth0", "veth0011aabb", 0, 42)),
            "link add eth0 type veth peer name veth0011aabb netns 42"
        );
    }

    #[test]
    fn test_build_link_ops() {
        let mac: MacAddress = "0a:00:00:00:00:01".parse().unwrap();
        let addr: IpPrefix = "10.0.0.5/24".parse().unwrap();
        assert_eq!(line(&build_link_set_state_args("eth0", false)), "link set dev eth0 down");
        assert_eq!(line(&build_link_set_state_args("eth0", true)), "link set dev eth0 up");
        assert_eq!(
            line(&build_link_set_address_args("eth0", &mac)),
            "link set dev eth0 address 0a:00:00:00:00:01"
        );
        assert_eq!(line(&build_addr_add_args("eth0", &addr)), "addr add 10.0.0.5/24 dev eth0");
        assert_eq!(line(&build_link_del_args("eth0")), "link del dev eth0");
        assert_eq!(line(&build_link_show_args("eth0")), "-j link show dev eth0");
    }
}
