//! Link and address operations through iproute2.

use serde::Deserialize;
use tracing::debug;

use ovnl2_common::shell::IP_CMD;
use ovnl2_common::{CommandRunner, ExecResult};
use ovnl2_types::{IpPrefix, MacAddress};

use crate::commands;
use crate::error::{LinkError, OvnL2Error, Result};

/// Peer name attempts before giving up on collisions.
pub const VETH_NAME_ATTEMPTS: usize = 10;

const NOT_FOUND_SIGNATURES: &[&str] = &["Cannot find device", "does not exist"];
const EXISTS_SIGNATURE: &str = "File exists";

/// One entry of `ip -j link show`.
#[derive(Debug, Deserialize)]
struct LinkInfo {
    ifname: String,
    #[serde(default)]
    address: Option<String>,
}

/// Maps `ip` stderr onto a [`LinkError`].
pub fn classify_failure(operation: &str, name: &str, result: &ExecResult) -> LinkError {
    let stderr = result.stderr.as_str();
    if NOT_FOUND_SIGNATURES.iter().any(|sig| stderr.contains(sig)) {
        LinkError::NotFound {
            name: name.to_string(),
        }
    } else {
        LinkError::Failed {
            operation: operation.to_string(),
            name: name.to_string(),
            message: result.combined_output(),
        }
    }
}

/// Random host-side veth name, `veth` followed by eight hex digits.
pub fn random_veth_name() -> String {
    format!("veth{:08x}", rand::random::<u32>())
}

/// `ip` client for the namespace of the calling thread.
pub struct IpLink<'a, R: ?Sized> {
    runner: &'a R,
}

impl<'a, R: CommandRunner + ?Sized> IpLink<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    async fn exec(&self, operation: &str, args: Vec<String>) -> Result<ExecResult> {
        self.runner
            .exec(IP_CMD, &args)
            .await
            .map_err(|e| OvnL2Error::command(format!("ip {}", operation), e))
    }

    async fn run(&self, operation: &str, name: &str, args: Vec<String>) -> Result<String> {
        let result = self.exec(operation, args).await?;
        if result.success() {
            Ok(result.stdout)
        } else {
            Err(classify_failure(operation, name, &result).into())
        }
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        match self.run("get", name, commands::build_link_show_args(name)).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_link_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Creates a veth pair named `name` whose peer lands in the namespace of
    /// process `peer_netns_pid` under a random name.
    ///
    /// Returns the peer name.
    pub async fn add_veth(&self, name: &str, mtu: u32, peer_netns_pid: u32) -> Result<String> {
        for _ in 0..VETH_NAME_ATTEMPTS {
            let peer = random_veth_name();
            let args = commands::build_veth_add_args(name, &peer, mtu, peer_netns_pid);
            let result = self.exec("add veth", args).await?;
            if result.success() {
                debug!(name = %name, peer = %peer, "Created veth pair");
                return Ok(peer);
            }
            if !result.stderr.contains(EXISTS_SIGNATURE) {
                return Err(classify_failure("add veth", name, &result).into());
            }
            debug!(peer = %peer, "Peer name taken, retrying");
        }
        Err(LinkError::Failed {
            operation: "add veth".to_string(),
            name: name.to_string(),
            message: format!("no free peer name after {} attempts", VETH_NAME_ATTEMPTS),
        }
        .into())
    }

    pub async fn set_up(&self, name: &str) -> Result<()> {
        self.run("set up", name, commands::build_link_set_state_args(name, true))
            .await
            .map(drop)
    }

    pub async fn set_down(&self, name: &str) -> Result<()> {
        self.run("set down", name, commands::build_link_set_state_args(name, false))
            .await
            .map(drop)
    }

    pub async fn set_address(&self, name: &str, mac: &MacAddress) -> Result<()> {
        let result = self
            .exec("set address", commands::build_link_set_address_args(name, mac))
            .await?;
        if result.success() {
            return Ok(());
        }
        let err = classify_failure("set address", name, &result);
        if let LinkError::NotFound { .. } = err {
            return Err(err.into());
        }
        Err(LinkError::InvalidHardwareAddress {
            address: mac.to_string(),
            reason: result.combined_output(),
        }
        .into())
    }

    pub async fn add_address(&self, name: &str, address: &IpPrefix) -> Result<()> {
        let result = self
            .exec("add address", commands::build_addr_add_args(name, address))
            .await?;
        if result.success() {
            return Ok(());
        }
        if result.stderr.contains(EXISTS_SIGNATURE) {
            return Err(LinkError::AddressConflict {
                name: name.to_string(),
                address: address.to_string(),
                message: result.stderr,
            }
            .into());
        }
        Err(classify_failure("add address", name, &result).into())
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        self.run("delete", name, commands::build_link_del_args(name))
            .await
            .map(drop)
    }

    /// Hardware address of a link.
    pub async fn mac_address(&self, name: &str) -> Result<MacAddress> {
        let out = self
            .run("get", name, commands::build_link_show_args(name))
            .await?;
        let links: Vec<LinkInfo> = serde_json::from_str(&out).map_err(|e| LinkError::Failed {
            operation: "get".to_string(),
            name: name.to_string(),
            message: format!("unexpected link JSON: {}", e),
        })?;
        // `show dev` lists exactly the requested link
        let link = links.into_iter().next().ok_or_else(|| LinkError::NotFound {
            name: name.to_string(),
        })?;
        debug!(name = %link.ifname, "Read link address");
        let address = link.address.unwrap_or_default();
        let mac = address
            .parse::<MacAddress>()
            .map_err(|e| LinkError::InvalidHardwareAddress {
                address: address.clone(),
                reason: e.to_string(),
            })?;
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovnl2_test::{ip_link_json_reply, CommandVerifier, FakeRunner};

    fn not_found() -> ExecResult {
        ExecResult::failure(1, "Cannot find device \"eth0\"")
    }

    #[test]
    fn test_random_veth_name() {
        let name = random_veth_name();
        assert_eq!(name.len(), 12);
        assert!(name.starts_with("veth"));
        assert!(name[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure("delete", "eth0", &not_found()),
            LinkError::NotFound { .. }
        ));
        assert!(matches!(
            classify_failure(
                "delete",
                "eth0",
                &ExecResult::failure(2, "RTNETLINK answers: Operation not permitted")
            ),
            LinkError::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_exists() {
        let runner = FakeRunner::new();
        runner.on(IP_CMD, "show dev eth0", not_found());
        let link = IpLink::new(&runner);
        assert!(!link.exists("eth0").await.unwrap());
        assert!(link.exists("eth1").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_veth_retries_on_collision() {
        let runner = FakeRunner::new();
        runner
            .on(IP_CMD, "type veth", ExecResult::failure(2, "RTNETLINK answers: File exists"))
            .on(IP_CMD, "type veth", ExecResult::success_with(""));
        let link = IpLink::new(&runner);

        let peer = link.add_veth("eth0", 1400, 1).await.unwrap();
        let calls = runner.invocations_of(IP_CMD);
        assert_eq!(calls.len(), 2);
        assert!(calls[1].has_arg(&peer));
        assert!(calls[1].contains("mtu 1400"));
    }

    #[tokio::test]
    async fn test_add_veth_gives_up() {
        let runner = FakeRunner::new();
        runner.on(IP_CMD, "type veth", ExecResult::failure(2, "RTNETLINK answers: File exists"));
        let link = IpLink::new(&runner);

        assert!(link.add_veth("eth0", 0, 1).await.is_err());
        assert_eq!(runner.invocations_of(IP_CMD).len(), VETH_NAME_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_add_address_conflict() {
        let runner = FakeRunner::new();
        runner.on(IP_CMD, "addr add", ExecResult::failure(2, "RTNETLINK answers: File exists"));
        let link = IpLink::new(&runner);

        let addr: IpPrefix = "10.0.0.5/24".parse().unwrap();
        let err = link.add_address("eth0", &addr).await.unwrap_err();
        assert!(matches!(
            err,
            OvnL2Error::Link(LinkError::AddressConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_set_address_rejected() {
        let runner = FakeRunner::new();
        runner.on(
            IP_CMD,
            "address",
            ExecResult::failure(2, "RTNETLINK answers: Cannot assign requested address"),
        );
        let link = IpLink::new(&runner);

        let mac: MacAddress = "0a:00:00:00:00:01".parse().unwrap();
        let err = link.set_address("eth0", &mac).await.unwrap_err();
        assert!(matches!(
            err,
            OvnL2Error::Link(LinkError::InvalidHardwareAddress { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_link() {
        let runner = FakeRunner::new();
        runner.on(IP_CMD, "link del", not_found());
        let link = IpLink::new(&runner);

        assert!(link.delete("eth0").await.unwrap_err().is_link_not_found());
    }

    #[tokio::test]
    async fn test_mac_address() {
        let runner = FakeRunner::new();
        runner.on(IP_CMD, "show dev veth1", ip_link_json_reply("veth1", "2e:aa:bb:cc:dd:ee"));
        let link = IpLink::new(&runner);

        let mac = link.mac_address("veth1").await.unwrap();
        assert_eq!(mac.to_string(), "2e:aa:bb:cc:dd:ee");
        CommandVerifier::new(&runner)
            .assert_invoked(IP_CMD, "-j link show dev veth1")
            .unwrap();
    }
}
