//! Logical switch and port provisioning in the northbound database.
//!
//! Every store command uses create-if-absent semantics, so repeating an
//! attach for the same workload reuses the switch and port it left behind.

use std::net::IpAddr;

use tracing::{debug, info, instrument};

use ovnl2_common::CommandRunner;
use ovnl2_types::{next_ip, IpPrefix};

use crate::address::{parse_port_addresses, AddressRequest, PortAddress};
use crate::commands;
use crate::ctl::Nbctl;
use crate::error::{OvnL2Error, Result};

/// Gateway of a subnet: its network address plus one.
pub fn gateway_for(subnet: &IpPrefix) -> Result<IpAddr> {
    next_ip(subnet.network_address()).ok_or_else(|| {
        OvnL2Error::address(format!("subnet {} has no room for a gateway", subnet))
    })
}

pub struct LogicalNetworkProvisioner<'a, R: ?Sized> {
    nbctl: Nbctl<'a, R>,
}

impl<'a, R: CommandRunner + ?Sized> LogicalNetworkProvisioner<'a, R> {
    pub fn new(nbctl: Nbctl<'a, R>) -> Self {
        Self { nbctl }
    }

    /// Creates the switch if absent and records its subnet with the gateway
    /// excluded from dynamic allocation.
    ///
    /// Returns the gateway, or `None` for a switch without a subnet.
    #[instrument(skip(self))]
    pub async fn ensure_switch(
        &self,
        name: &str,
        subnet: Option<&IpPrefix>,
    ) -> Result<Option<IpAddr>> {
        let subnet = subnet.map(IpPrefix::network);
        let gateway = subnet.as_ref().map(gateway_for).transpose()?;
        let args = commands::build_ls_add_args(name, subnet.as_ref().zip(gateway));

        self.nbctl
            .run("failed to create logical switch", args)
            .await?;

        info!(switch = %name, gateway = ?gateway, "Logical switch ensured");
        Ok(gateway)
    }

    /// Creates the port if absent and sets its address request.
    ///
    /// Returns once the southbound database has acknowledged the change.
    #[instrument(skip(self))]
    pub async fn ensure_port(
        &self,
        switch: &str,
        port: &str,
        request: &AddressRequest,
        subnet: Option<&IpPrefix>,
    ) -> Result<()> {
        request.validate_for(subnet)?;
        let args = commands::build_lsp_add_args(switch, port, request, subnet.is_some());

        self.nbctl
            .run(&format!("failed to add logical switch port {}", port), args)
            .await?;

        info!(switch = %switch, port = %port, "Logical switch port ensured");
        Ok(())
    }

    /// Reads back the address the store holds for a port.
    #[instrument(skip(self))]
    pub async fn resolve_address(&self, port: &str, is_static: bool) -> Result<PortAddress> {
        let args = commands::build_get_addresses_args(port, is_static);
        let output = self
            .nbctl
            .run(&format!("failed to get addresses for {}", port), args)
            .await?;

        let address = parse_port_addresses(port, &output)?;
        debug!(port = %port, address = %address, "Resolved port address");
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ovnl2_common::shell::OVN_NBCTL_CMD;
    use ovnl2_common::RetryPolicy;
    use ovnl2_test::{
        dynamic_addresses_reply, empty_addresses_reply, static_addresses_reply, CommandVerifier,
        FakeRunner,
    };

    fn nbctl(runner: &FakeRunner) -> Nbctl<'_, FakeRunner> {
        Nbctl::with_settings(runner, Vec::new(), Duration::from_secs(15), RetryPolicy::none())
    }

    #[test]
    fn test_gateway_for() {
        let subnet: IpPrefix = "10.0.0.0/24".parse().unwrap();
        assert_eq!(gateway_for(&subnet).unwrap().to_string(), "10.0.0.1");

        let subnet: IpPrefix = "fd00::/64".parse().unwrap();
        assert_eq!(gateway_for(&subnet).unwrap().to_string(), "fd00::1");
    }

    #[tokio::test]
    async fn test_ensure_switch_with_subnet() {
        let runner = FakeRunner::new();
        let provisioner = LogicalNetworkProvisioner::new(nbctl(&runner));
        let subnet: IpPrefix = "10.0.0.0/24".parse().unwrap();

        let gateway = provisioner
            .ensure_switch("ovnl2_net1", Some(&subnet))
            .await
            .unwrap();
        assert_eq!(gateway, Some("10.0.0.1".parse().unwrap()));

        let verifier = CommandVerifier::new(&runner);
        let call = verifier.assert_invoked(OVN_NBCTL_CMD, "ls-add ovnl2_net1").unwrap();
        assert!(call.has_arg("--may-exist"));
        assert!(call.has_arg("other-config:subnet=10.0.0.0/24"));
        assert!(call.has_arg("other-config:exclude_ips=10.0.0.1"));
    }

    #[tokio::test]
    async fn test_ensure_switch_twice_is_idempotent() {
        let runner = FakeRunner::new();
        let provisioner = LogicalNetworkProvisioner::new(nbctl(&runner));
        let subnet: IpPrefix = "10.0.0.0/24".parse().unwrap();

        let first = provisioner.ensure_switch("ovnl2_net1", Some(&subnet)).await.unwrap();
        let second = provisioner.ensure_switch("ovnl2_net1", Some(&subnet)).await.unwrap();
        assert_eq!(first, second);

        let calls = runner.invocations_of(OVN_NBCTL_CMD);
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.has_arg("--may-exist")));
        assert_eq!(calls[0].args, calls[1].args);
    }

    #[tokio::test]
    async fn test_ensure_switch_without_subnet() {
        let runner = FakeRunner::new();
        let provisioner = LogicalNetworkProvisioner::new(nbctl(&runner));

        assert_eq!(provisioner.ensure_switch("ovnl2_net1", None).await.unwrap(), None);
        let calls = runner.invocations_of(OVN_NBCTL_CMD);
        assert!(!calls[0].contains("other-config"));
    }

    #[tokio::test]
    async fn test_ensure_port_waits_for_southbound() {
        let runner = FakeRunner::new();
        let provisioner = LogicalNetworkProvisioner::new(nbctl(&runner));
        let subnet: IpPrefix = "10.0.0.0/24".parse().unwrap();

        provisioner
            .ensure_port("ovnl2_net1", "ovnl2_ns_pod_net1", &AddressRequest::Dynamic, Some(&subnet))
            .await
            .unwrap();

        let verifier = CommandVerifier::new(&runner);
        let call = verifier.assert_invoked(OVN_NBCTL_CMD, "lsp-add").unwrap();
        assert!(call.has_arg("--wait=sb"));
        assert!(call.contains("clear logical_switch_port ovnl2_ns_pod_net1 dynamic_addresses"));
        assert!(call.has_arg("dynamic"));
    }

    #[tokio::test]
    async fn test_ensure_port_revalidates_request() {
        let runner = FakeRunner::new();
        let provisioner = LogicalNetworkProvisioner::new(nbctl(&runner));
        let subnet: IpPrefix = "10.0.0.0/24".parse().unwrap();
        let request = AddressRequest::Static {
            mac: "0a:00:00:00:00:01".parse().unwrap(),
            ip: None,
        };

        let err = provisioner
            .ensure_port("sw", "p", &request, Some(&subnet))
            .await
            .unwrap_err();
        assert!(matches!(err, OvnL2Error::Address(_)));
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_dynamic_address() {
        let runner = FakeRunner::new();
        runner.on(
            OVN_NBCTL_CMD,
            "dynamic_addresses",
            dynamic_addresses_reply("0a:00:00:00:00:07", "10.0.0.7"),
        );
        let provisioner = LogicalNetworkProvisioner::new(nbctl(&runner));

        let address = provisioner.resolve_address("p", false).await.unwrap();
        assert_eq!(address.to_string(), "0a:00:00:00:00:07 10.0.0.7");
    }

    #[tokio::test]
    async fn test_resolve_static_address() {
        let runner = FakeRunner::new();
        runner.on(OVN_NBCTL_CMD, "addresses", static_addresses_reply("0a:00:00:00:00:02"));
        let provisioner = LogicalNetworkProvisioner::new(nbctl(&runner));

        let address = provisioner.resolve_address("p", true).await.unwrap();
        assert_eq!(address.mac.unwrap().to_string(), "0a:00:00:00:00:02");
        assert!(address.ip.is_none());
        let verifier = CommandVerifier::new(&runner);
        let call = verifier.assert_invoked(OVN_NBCTL_CMD, "get logical_switch_port p").unwrap();
        assert_eq!(call.args.last().map(String::as_str), Some("addresses"));
    }

    #[tokio::test]
    async fn test_resolve_empty_address() {
        let runner = FakeRunner::new();
        runner.on(OVN_NBCTL_CMD, "addresses", empty_addresses_reply());
        let provisioner = LogicalNetworkProvisioner::new(nbctl(&runner));

        assert!(provisioner.resolve_address("p", true).await.unwrap().is_empty());
    }
}
