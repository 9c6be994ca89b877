//! `berthd serve`: run the HTTP API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use berth_core::mounts::MountDiscovery;
use berth_runtime::backend::{self, BackendKind};
use berth_runtime::service::{ContainerService, ServiceSettings};
use berth_server::api::{AppState, create_router};
use berth_server::host::HostIdentity;
use berth_server::server;
use clap::Args;

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Configuration file (defaults to ./config.yml when present).
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Listen address (defaults to HOSTIP:PORT from the configuration).
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Container engine backend: docker or memory.
    #[arg(long, default_value = "docker")]
    pub engine: BackendKind,
}

/// Executes the `serve` command.
///
/// # Errors
///
/// Returns an error if configuration, engine connection or the server fails.
pub async fn execute(args: ServeArgs) -> anyhow::Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let host = HostIdentity::discover(&config).await;
    let engine = backend::connect(args.engine, Duration::from_secs(config.engine_timeout_secs))?;
    let mounts = MountDiscovery::from_config(&config).discover();
    let settings = ServiceSettings::from_config(&config, host.name.clone(), host.ip, mounts)?;

    let state = AppState {
        service: Arc::new(ContainerService::new(engine, settings)),
        require_username: config.require_username,
    };
    let addr = args
        .listen
        .unwrap_or_else(|| SocketAddr::new(host.ip, config.listen_port));
    server::serve(create_router(state), addr).await?;
    Ok(())
}
