//! `berthd check`: validate configuration and show what the service would use.

use std::path::PathBuf;

use berth_core::mounts::MountDiscovery;
use berth_core::resources::ResourcePolicy;
use berth_server::host::HostIdentity;
use clap::Args;

/// Arguments for the `check` command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Configuration file (defaults to ./config.yml when present).
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Executes the `check` command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
#[allow(clippy::print_stdout)]
pub async fn execute(args: CheckArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let _policy = ResourcePolicy::from_config(&config)?;
    let host = HostIdentity::discover(&config).await;
    let mounts = MountDiscovery::from_config(&config).discover();

    let report = serde_json::json!({
        "config": config,
        "host": host.name,
        "host ip": host.ip,
        "default mounts": mounts,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
