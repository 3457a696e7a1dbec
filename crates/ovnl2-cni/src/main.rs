//! ovn-l2 - OVN L2 switch CNI plugin
//!
//! Entry point invoked by the container runtime. Results and errors are
//! printed to stdout as JSON; logs go to stderr.

use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ovnl2_cni::error::cni_codes;
use ovnl2_cni::netconf::requested_version;
use ovnl2_cni::{
    CmdArgs, CniCommand, ErrorResult, OvnConfig, OvnL2Error, OvnL2Plugin, VersionResult,
};
use ovnl2_common::SystemRunner;

/// Environment variable holding the log filter, e.g. `debug` or
/// `ovnl2_cni=trace`.
const LOG_ENV: &str = "OVN_L2_LOG";

/// Initializes tracing/logging subsystem
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

async fn run(args: &CmdArgs, stdin: &[u8]) -> anyhow::Result<Option<String>> {
    let command = args.cni_command()?;
    debug!(command = %command, container = %args.container_id, "Plugin invoked");

    match command {
        CniCommand::Add => {
            let config = OvnConfig::load(&args.config)?;
            let plugin = OvnL2Plugin::new(Arc::new(SystemRunner::new(config.exec_timeout())));
            let result = plugin.cmd_add(&config, args, stdin).await?;
            let json = serde_json::to_string(&result).context("failed to encode result")?;
            Ok(Some(json))
        }
        CniCommand::Del => {
            let plugin = OvnL2Plugin::new(Arc::new(SystemRunner::default()));
            plugin.cmd_del(args, stdin).await?;
            Ok(None)
        }
        CniCommand::Check => {
            let plugin = OvnL2Plugin::new(Arc::new(SystemRunner::default()));
            plugin.cmd_check(args, stdin)?;
            Ok(None)
        }
        CniCommand::Version => {
            let version = VersionResult::new(&requested_version(stdin));
            let json = serde_json::to_string(&version).context("failed to encode version")?;
            Ok(Some(json))
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();

    let args = CmdArgs::parse();

    let mut stdin = Vec::new();
    if let Err(e) = std::io::stdin().read_to_end(&mut stdin) {
        error!(error = %e, "Failed to read network configuration");
    }

    match run(&args, &stdin).await {
        Ok(Some(output)) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            let version = requested_version(&stdin);
            let reply = match err.downcast_ref::<OvnL2Error>() {
                Some(plugin_err) => ErrorResult::from_error(&version, plugin_err),
                None => ErrorResult::new(&version, cni_codes::INTERNAL, format!("{:#}", err)),
            };
            error!(code = reply.code, "{}", reply.msg);
            match serde_json::to_string(&reply) {
                Ok(json) => println!("{}", json),
                Err(_) => println!("{{\"code\":{},\"msg\":{:?}}}", reply.code, reply.msg),
            }
            ExitCode::FAILURE
        }
    }
}
