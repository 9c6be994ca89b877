//! `berthd probe-port`: run one port scan over the configured range.

use std::path::PathBuf;

use berth_core::port::PortAllocator;
use berth_server::host::HostIdentity;
use clap::Args;

/// Arguments for the `probe-port` command.
#[derive(Args, Debug)]
pub struct ProbePortArgs {
    /// Configuration file (defaults to ./config.yml when present).
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Executes the `probe-port` command.
///
/// The port is not reserved; a later launch probes again.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or every port is taken.
#[allow(clippy::print_stdout)]
pub async fn execute(args: ProbePortArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let host = HostIdentity::discover(&config).await;
    let port = PortAllocator::new(host.ip, config.min_port, config.max_port)
        .allocate()
        .await?;
    println!("{port}");
    Ok(())
}
