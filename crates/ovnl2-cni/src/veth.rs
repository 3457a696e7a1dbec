//! Veth pair wiring between the host and a workload namespace.

use std::sync::Arc;

use tracing::{info, instrument};

use ovnl2_common::CommandRunner;
use ovnl2_types::{IpPrefix, MacAddress};

use crate::error::{LinkError, Result};
use crate::link::IpLink;
use crate::netns::NetNs;
use crate::result::{Interface, VethPair};

pub struct NamespaceWirer<R: ?Sized> {
    runner: Arc<R>,
}

impl<R: CommandRunner + ?Sized + 'static> NamespaceWirer<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self { runner }
    }

    /// Creates the pair and configures the container end.
    ///
    /// Inside the namespace the link named `if_name` is created, its peer is
    /// pushed to the host namespace, and the link is taken down, given `mac`,
    /// brought up and assigned `address`. The host end is brought up from
    /// the host namespace.
    #[instrument(skip(self, netns), fields(netns = %netns.path().display()))]
    pub async fn setup_veth(
        &self,
        netns: &NetNs,
        if_name: &str,
        mtu: u32,
        mac: MacAddress,
        address: Option<IpPrefix>,
    ) -> Result<VethPair> {
        let runner = Arc::clone(&self.runner);
        let host_pid = std::process::id();
        let name = if_name.to_string();

        let host_veth = netns
            .run(move || configure_container_link(runner, name, mtu, mac, address, host_pid))
            .await?;

        let link = IpLink::new(&*self.runner);
        link.set_up(&host_veth).await?;
        let host_mac = link.mac_address(&host_veth).await?;

        info!(host = %host_veth, container = %if_name, mac = %mac, "Wired veth pair");
        Ok(VethPair {
            host: Interface::host(host_veth, host_mac),
            container: Interface::container(if_name, mac, netns.path().display().to_string()),
        })
    }

    /// Deletes `if_name` inside the namespace. A missing link is not an error.
    #[instrument(skip(self, netns), fields(netns = %netns.path().display()))]
    pub async fn teardown_veth(&self, netns: &NetNs, if_name: &str) -> Result<()> {
        let runner = Arc::clone(&self.runner);
        let name = if_name.to_string();

        netns.run(move || delete_container_link(runner, name)).await
    }
}

/// Runs inside the workload namespace. Returns the host-side peer name.
async fn configure_container_link<R: CommandRunner + ?Sized>(
    runner: Arc<R>,
    name: String,
    mtu: u32,
    mac: MacAddress,
    address: Option<IpPrefix>,
    host_pid: u32,
) -> Result<String> {
    let link = IpLink::new(&*runner);
    if link.exists(&name).await? {
        return Err(LinkError::AlreadyExists { name }.into());
    }

    let host_veth = link.add_veth(&name, mtu, host_pid).await?;
    link.set_down(&name).await?;
    link.set_address(&name, &mac).await?;
    link.set_up(&name).await?;
    if let Some(address) = address {
        link.add_address(&name, &address).await?;
    }
    Ok(host_veth)
}

/// Runs inside the workload namespace.
async fn delete_container_link<R: CommandRunner + ?Sized>(runner: Arc<R>, name: String) -> Result<()> {
    match IpLink::new(&*runner).delete(&name).await {
        Err(e) if e.is_link_not_found() => {
            info!(link = %name, "Link already removed");
            Ok(())
        }
        other => other,
    }
}
