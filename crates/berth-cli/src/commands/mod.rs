//! CLI command definitions and dispatch.

pub mod check;
pub mod probe_port;
pub mod serve;

use std::path::{Path, PathBuf};

use berth_common::config::BerthConfig;
use berth_common::constants::{BIN_NAME, DEFAULT_CONFIG_FILE};
use berth_common::verbosity;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

/// berthd: run per-user containers on a shared host over HTTP.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json: bool,

    /// Append logs to this file instead of stderr.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API.
    Serve(serve::ServeArgs),
    /// Validate the configuration and print the resolved settings.
    Check(check::CheckArgs),
    /// Find the port the next default-image launch would get.
    ProbePort(probe_port::ProbePortArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => serve::execute(args).await,
        Command::Check(args) => check::execute(args).await,
        Command::ProbePort(args) => probe_port::execute(args).await,
    }
}

/// Loads the configuration and applies its initial log level.
///
/// Without an explicit path, `config.yml` in the working directory is used
/// when present and built-in defaults otherwise.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<BerthConfig> {
    let config = match path {
        Some(path) => BerthConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            BerthConfig::load(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => {
            tracing::warn!(file = DEFAULT_CONFIG_FILE, "no configuration file, using defaults");
            BerthConfig::default()
        }
    };
    let level = verbosity::parse_name(&config.log_level).unwrap_or_else(|| {
        tracing::warn!(level = %config.log_level, "unknown LOGLEVEL, using WARNING");
        LevelFilter::WARN
    });
    let _ = verbosity::set(level);
    Ok(config)
}
