//! Call context decoding.
//!
//! The container runtime passes the call through `CNI_*` environment
//! variables and the network configuration on stdin.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use crate::config::DEFAULT_CONFIG_PATH;
use crate::error::OvnL2Error;

/// Plugin invocation context.
#[derive(Debug, Clone, Parser)]
#[command(name = "ovn-l2", version, about = "An OVN L2 switch plugin")]
pub struct CmdArgs {
    /// ADD, DEL, CHECK or VERSION
    #[arg(long, env = "CNI_COMMAND")]
    pub command: Option<String>,

    #[arg(long, env = "CNI_CONTAINERID", default_value = "")]
    pub container_id: String,

    /// Path to the workload network namespace
    #[arg(long, env = "CNI_NETNS", default_value = "")]
    pub netns: String,

    /// Interface name to create inside the namespace
    #[arg(long = "ifname", env = "CNI_IFNAME", default_value = "")]
    pub if_name: String,

    /// `K=V;K=V` plugin arguments
    #[arg(long, env = "CNI_ARGS", default_value = "")]
    pub args: String,

    #[arg(long, env = "CNI_PATH", default_value = "")]
    pub path: String,

    /// Persisted control-plane configuration
    #[arg(long, env = "OVN_L2_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

impl CmdArgs {
    /// The requested command.
    pub fn cni_command(&self) -> Result<CniCommand, OvnL2Error> {
        self.command
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| OvnL2Error::environment("CNI_COMMAND env variable missing"))?
            .parse()
    }

    /// Checks the variables attach and detach rely on.
    pub fn require_interface(&self) -> Result<(), OvnL2Error> {
        if self.if_name.is_empty() {
            return Err(OvnL2Error::environment("CNI_IFNAME env variable missing"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CniCommand {
    Add,
    Del,
    Check,
    Version,
}

impl FromStr for CniCommand {
    type Err = OvnL2Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADD" => Ok(CniCommand::Add),
            "DEL" => Ok(CniCommand::Del),
            "CHECK" => Ok(CniCommand::Check),
            "VERSION" => Ok(CniCommand::Version),
            other => Err(OvnL2Error::environment(format!(
                "unknown CNI_COMMAND: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for CniCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CniCommand::Add => "ADD",
            CniCommand::Del => "DEL",
            CniCommand::Check => "CHECK",
            CniCommand::Version => "VERSION",
        };
        f.write_str(s)
    }
}
