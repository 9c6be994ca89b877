//! Container engine backends.

pub mod docker;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use berth_common::error::{BerthError, Result};

use crate::engine::ContainerEngine;

/// Selectable engine backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// The local Docker-compatible daemon.
    Docker,
    /// An in-process engine that keeps containers in memory.
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = BerthError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "docker" => Ok(Self::Docker),
            "memory" => Ok(Self::Memory),
            other => Err(BerthError::Config {
                message: format!("unknown engine backend {other:?} (expected docker or memory)"),
            }),
        }
    }
}

/// Creates the requested backend with every call bounded by `timeout`.
///
/// # Errors
///
/// Returns an error if the Docker client cannot be configured.
pub fn connect(kind: BackendKind, timeout: Duration) -> Result<Arc<dyn ContainerEngine>> {
    let engine: Arc<dyn ContainerEngine> = match kind {
        BackendKind::Docker => Arc::new(docker::DockerEngine::connect(timeout)?),
        BackendKind::Memory => Arc::new(memory::MemoryEngine::new()),
    };
    tracing::info!(backend = engine.name(), "container engine ready");
    Ok(engine)
}
