//! Attach, detach and check.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use ovnl2_common::CommandRunner;
use ovnl2_types::{IpPrefix, MacAddress};

use crate::address::AddressRequest;
use crate::bridge::BridgeBinder;
use crate::config::OvnConfig;
use crate::ctl::{Nbctl, Vsctl};
use crate::error::{LinkError, OvnL2Error, Result};
use crate::identity::WorkloadIdentity;
use crate::naming;
use crate::netconf::NetworkConfig;
use crate::netns::NetNs;
use crate::provisioner::LogicalNetworkProvisioner;
use crate::result::CniResult;
use crate::skel::CmdArgs;
use crate::veth::NamespaceWirer;

/// A logical port ready to be wired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedPort {
    pub switch: String,
    pub port: String,
    pub mac: MacAddress,
    /// Port IP with the subnet prefix length.
    pub address: Option<IpPrefix>,
    pub gateway: Option<IpAddr>,
}

pub struct OvnL2Plugin<R: ?Sized> {
    runner: Arc<R>,
}

impl<R: CommandRunner + ?Sized + 'static> OvnL2Plugin<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self { runner }
    }

    /// Creates the switch and port for a workload and reads back the
    /// address the store settled on.
    #[instrument(skip_all, fields(network = %net.name, pod = %identity.name))]
    pub async fn provision(
        &self,
        config: &OvnConfig,
        net: &NetworkConfig,
        identity: &WorkloadIdentity,
    ) -> Result<ProvisionedPort> {
        let subnet = net.subnet.as_ref();
        let request = AddressRequest::resolve(subnet, identity.mac, identity.ip)?;

        let switch = naming::switch_name(&net.name);
        let port = naming::port_name(&identity.namespace, &identity.name, &net.name);
        let provisioner = LogicalNetworkProvisioner::new(Nbctl::new(&*self.runner, config));

        let gateway = provisioner.ensure_switch(&switch, subnet).await?;
        provisioner
            .ensure_port(&switch, &port, &request, subnet)
            .await?;
        let resolved = provisioner
            .resolve_address(&port, request.is_static())
            .await?;

        let mac = resolved.mac.ok_or_else(|| LinkError::InvalidHardwareAddress {
            address: String::new(),
            reason: format!("no MAC address assigned to port {}", port),
        })?;
        let address = match resolved.ip {
            Some(ip) => {
                let subnet = subnet.ok_or_else(|| {
                    OvnL2Error::address(format!(
                        "port {} was assigned {} but the network has no subnet",
                        port, ip
                    ))
                })?;
                Some(
                    subnet
                        .with_address(ip)
                        .map_err(|e| OvnL2Error::address(e.to_string()))?,
                )
            }
            None => None,
        };

        Ok(ProvisionedPort {
            switch,
            port,
            mac,
            address,
            gateway,
        })
    }

    /// Attach: provision, wire the namespace, bind to the bridge.
    ///
    /// A failure part-way leaves whatever was created in place; a later
    /// attach for the same workload reuses it.
    #[instrument(skip_all, fields(container = %args.container_id, ifname = %args.if_name))]
    pub async fn cmd_add(
        &self,
        config: &OvnConfig,
        args: &CmdArgs,
        stdin: &[u8],
    ) -> Result<CniResult> {
        let net = NetworkConfig::parse(stdin)?;
        args.require_interface()?;
        if args.netns.is_empty() {
            return Err(OvnL2Error::environment("CNI_NETNS env variable missing"));
        }
        let netns = NetNs::open(&args.netns)?;
        let identity = WorkloadIdentity::from_cni_args(&args.args)?;

        let port = self.provision(config, &net, &identity).await?;

        let veth = NamespaceWirer::new(Arc::clone(&self.runner))
            .setup_veth(&netns, &args.if_name, net.mtu, port.mac, port.address)
            .await?;

        BridgeBinder::new(Vsctl::new(&*self.runner, config))
            .attach_to_bridge(config.ovs_bridge(), &veth.host.name, &port.mac, &port.port)
            .await?;

        info!(port = %port.port, host = %veth.host.name, "Workload attached");
        Ok(CniResult::assemble(
            &net.cni_version,
            veth,
            port.address,
            port.gateway,
        ))
    }

    /// Detach: remove the container link. Anything already gone counts as
    /// removed; the logical port is left in the store.
    #[instrument(skip_all, fields(container = %args.container_id, ifname = %args.if_name))]
    pub async fn cmd_del(&self, args: &CmdArgs, stdin: &[u8]) -> Result<()> {
        NetworkConfig::parse(stdin)?;

        if args.netns.is_empty() || args.if_name.is_empty() {
            debug!("No namespace or interface, nothing to clean up");
            return Ok(());
        }
        let Some(netns) = NetNs::try_open(&args.netns)? else {
            info!(netns = %args.netns, "Namespace already removed");
            return Ok(());
        };

        NamespaceWirer::new(Arc::clone(&self.runner))
            .teardown_veth(&netns, &args.if_name)
            .await
    }

    /// Check: accepted without verification.
    pub fn cmd_check(&self, _args: &CmdArgs, _stdin: &[u8]) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use ovnl2_common::shell::{IP_CMD, OVN_NBCTL_CMD};
    use ovnl2_test::{empty_addresses_reply, net_conf, CniArgsBuilder, FakeRunner};

    fn config() -> OvnConfig {
        OvnConfig::from_toml_str("[exec]\nretry-attempts = 0\nretry-interval-secs = 0\n").unwrap()
    }

    fn cmd_args(netns: &str, args: &str) -> CmdArgs {
        CmdArgs::try_parse_from([
            "ovn-l2",
            "--command",
            "ADD",
            "--netns",
            netns,
            "--ifname",
            "eth0",
            "--args",
            args,
        ])
        .unwrap()
    }

    fn identity(args: &str) -> WorkloadIdentity {
        WorkloadIdentity::from_cni_args(args).unwrap()
    }

    #[tokio::test]
    async fn test_provision_rejects_before_touching_store() {
        let runner = Arc::new(FakeRunner::new());
        let plugin = OvnL2Plugin::new(runner.clone());
        let net = NetworkConfig::parse(&net_conf("net1", None)).unwrap();
        let id = identity(&CniArgsBuilder::pod("ns", "pod").with_ip("10.0.0.5").build());

        let err = plugin.provision(&config(), &net, &id).await.unwrap_err();
        assert!(err.to_string().contains("static IP requires a subnet"));
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_provision_without_mac_read_back() {
        let runner = Arc::new(FakeRunner::new());
        runner.on(OVN_NBCTL_CMD, "addresses", empty_addresses_reply());
        let plugin = OvnL2Plugin::new(runner.clone());
        let net = NetworkConfig::parse(&net_conf("net1", None)).unwrap();
        let id = identity(&CniArgsBuilder::pod("ns", "pod").build());

        let err = plugin.provision(&config(), &net, &id).await.unwrap_err();
        assert!(matches!(
            err,
            OvnL2Error::Link(LinkError::InvalidHardwareAddress { .. })
        ));
    }

    #[tokio::test]
    async fn test_cmd_add_missing_netns() {
        let runner = Arc::new(FakeRunner::new());
        let plugin = OvnL2Plugin::new(runner.clone());
        let args = cmd_args("/nonexistent/netns", &CniArgsBuilder::pod("ns", "pod").build());

        let err = plugin
            .cmd_add(&config(), &args, &net_conf("net1", Some("10.0.0.0/24")))
            .await
            .unwrap_err();
        assert!(matches!(err, OvnL2Error::Link(LinkError::Namespace { .. })));
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_cmd_add_invalid_config() {
        let runner = Arc::new(FakeRunner::new());
        let plugin = OvnL2Plugin::new(runner);
        let args = cmd_args("/nonexistent/netns", "");

        let err = plugin.cmd_add(&config(), &args, b"{}").await.unwrap_err();
        assert!(matches!(err, OvnL2Error::Config(_)));
    }

    #[tokio::test]
    async fn test_cmd_del_without_netns_is_noop() {
        let runner = Arc::new(FakeRunner::new());
        let plugin = OvnL2Plugin::new(runner.clone());
        let args = cmd_args("", "");

        plugin.cmd_del(&args, &net_conf("net1", None)).await.unwrap();
        assert!(runner.invocations_of(IP_CMD).is_empty());
    }

    #[tokio::test]
    async fn test_cmd_del_vanished_netns_is_noop() {
        let runner = Arc::new(FakeRunner::new());
        let plugin = OvnL2Plugin::new(runner.clone());
        let args = cmd_args("/nonexistent/netns", "");

        plugin.cmd_del(&args, &net_conf("net1", None)).await.unwrap();
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_cmd_del_still_validates_config() {
        let plugin = OvnL2Plugin::new(Arc::new(FakeRunner::new()));
        let args = cmd_args("", "");

        assert!(plugin.cmd_del(&args, b"{\"name\":\"\"}").await.is_err());
    }

    #[test]
    fn test_cmd_check_accepts() {
        let plugin = OvnL2Plugin::new(Arc::new(FakeRunner::new()));
        assert!(plugin.cmd_check(&cmd_args("", ""), b"").is_ok());
    }
}
