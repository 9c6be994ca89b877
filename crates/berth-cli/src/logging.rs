//! Subscriber installation.
//!
//! Events pass two filters: `RUST_LOG` (defaulting to everything, with HTTP
//! internals held at `info`) and the process-wide verbosity, which requests
//! can change at runtime through their `loglevel` field.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use berth_common::verbosity;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, filter, fmt};

const DEFAULT_DIRECTIVES: &str = "trace,hyper=info,h2=info,tower=info";

/// Installs the global subscriber.
///
/// Output goes to stderr, or is appended to `log_file` when given.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed.
pub fn init(json: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let writer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let output: Box<dyn Layer<Registry> + Send + Sync> = if json {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(log_file.is_none())
            .boxed()
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::registry()
        .with(output.with_filter(filter::filter_fn(verbosity::enabled)))
        .with(env_filter)
        .try_init()
        .context("cannot install tracing subscriber")?;
    Ok(())
}
