//! Host-side binding to the integration bridge.

use tracing::{info, instrument};

use ovnl2_common::CommandRunner;
use ovnl2_types::MacAddress;

use crate::commands;
use crate::ctl::Vsctl;
use crate::error::Result;

pub struct BridgeBinder<'a, R: ?Sized> {
    vsctl: Vsctl<'a, R>,
}

impl<'a, R: CommandRunner + ?Sized> BridgeBinder<'a, R> {
    pub fn new(vsctl: Vsctl<'a, R>) -> Self {
        Self { vsctl }
    }

    /// Adds `host_iface` to `bridge` if absent and tags it with the
    /// attached MAC and the logical port it implements.
    #[instrument(skip(self))]
    pub async fn attach_to_bridge(
        &self,
        bridge: &str,
        host_iface: &str,
        mac: &MacAddress,
        port: &str,
    ) -> Result<()> {
        let args = commands::build_add_port_args(bridge, host_iface, mac, port);
        self.vsctl
            .run(&format!("failed to add port {} to OVS", port), args)
            .await?;

        info!(bridge = %bridge, iface = %host_iface, port = %port, "Bound host interface");
        Ok(())
    }
}
