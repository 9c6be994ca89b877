//! # berthd
//!
//! HTTP control plane that runs, lists, stops and deletes containers for
//! many callers on one shared container host.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;
mod logging;

use clap::Parser;

use crate::commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.json, cli.log_file.as_deref())?;
    commands::execute(cli).await
}
