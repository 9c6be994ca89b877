//! In-process engine backend.
//!
//! Keeps containers in a mutex-guarded list and honours the same contract as
//! the Docker backend: names are unique, auto-remove containers disappear on
//! stop, and running containers need `force` to be removed. Useful for local
//! trials of the HTTP surface and as the engine behind the test suites.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use berth_common::constants::CONTAINER_SHORT_ID_LEN;
use berth_common::error::{BerthError, Result};
use berth_common::types::{
    ContainerDetails, ContainerRecord, ImageRecord, LaunchSpec, MountPointInfo, NetworkMode,
};
use berth_core::resources::parse_memory;

use crate::engine::ContainerEngine;

const RUNNING: &str = "running";
const EXITED: &str = "exited";

#[derive(Debug, Clone)]
struct Entry {
    details: ContainerDetails,
    auto_remove: bool,
}

#[derive(Debug, Default)]
struct State {
    containers: Vec<Entry>,
    images: Vec<ImageRecord>,
    runs: usize,
}

impl State {
    fn position(&self, name_or_id: &str) -> Result<usize> {
        self.containers
            .iter()
            .position(|e| e.details.name == name_or_id)
            .or_else(|| {
                self.containers.iter().position(|e| {
                    !name_or_id.is_empty() && e.details.short_id.starts_with(name_or_id)
                })
            })
            .ok_or_else(|| BerthError::NotFound {
                kind: "container",
                id: name_or_id.to_string(),
            })
    }
}

/// Engine that keeps containers in process memory.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: Mutex<State>,
}

impl MemoryEngine {
    /// Creates an empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine that reports the given images.
    #[must_use]
    pub fn with_images(images: Vec<ImageRecord>) -> Self {
        Self {
            state: Mutex::new(State {
                images,
                ..State::default()
            }),
        }
    }

    /// Adds an existing container, as if created outside this service.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is already taken.
    pub fn insert(&self, details: ContainerDetails) -> Result<()> {
        let mut state = self.lock("insert")?;
        if state.containers.iter().any(|e| e.details.name == details.name) {
            return Err(conflict("insert", &details.name));
        }
        state.containers.push(Entry {
            details,
            auto_remove: false,
        });
        Ok(())
    }

    /// Number of successful [`ContainerEngine::run`] calls so far.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.state.lock().map_or(0, |state| state.runs)
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| BerthError::engine(operation, "engine state lock poisoned"))
    }
}

fn conflict(operation: &'static str, name: &str) -> BerthError {
    BerthError::engine(operation, format!("container name {name:?} is already in use"))
}

fn new_id() -> String {
    format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

fn details_from_spec(spec: &LaunchSpec) -> Result<ContainerDetails> {
    let memory_bytes = parse_memory(&spec.mem_limit)
        .ok()
        .and_then(|b| i64::try_from(b).ok())
        .ok_or_else(|| BerthError::Config {
            message: format!("unusable memory limit {:?}", spec.mem_limit),
        })?;
    let published_ports: BTreeMap<String, Vec<String>> = if spec.network_mode == NetworkMode::Host {
        BTreeMap::new()
    } else {
        spec.ports
            .iter()
            .map(|(port, host)| {
                let key = if port.contains('/') {
                    port.clone()
                } else {
                    format!("{port}/tcp")
                };
                (key, host.iter().map(ToString::to_string).collect())
            })
            .collect()
    };
    let created = now();
    Ok(ContainerDetails {
        name: spec.name.clone(),
        short_id: new_id().chars().take(CONTAINER_SHORT_ID_LEN).collect(),
        status: RUNNING.to_string(),
        started_at: created.clone(),
        created,
        image: spec.image.clone(),
        memory_bytes,
        nano_cpus: spec.nano_cpus,
        args: spec.command.clone().unwrap_or_default(),
        published_ports,
        mounts: spec
            .mounts
            .iter()
            .map(|m| MountPointInfo {
                kind: "bind".to_string(),
                source: m.source.clone(),
                destination: m.target.clone(),
                mode: if m.read_only { "ro" } else { "" }.to_string(),
                rw: !m.read_only,
            })
            .collect(),
    })
}

#[async_trait]
impl ContainerEngine for MemoryEngine {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn list_containers(&self) -> Result<Vec<ContainerRecord>> {
        let state = self.lock("list")?;
        Ok(state.containers.iter().map(|e| e.details.record()).collect())
    }

    async fn inspect(&self, name_or_id: &str) -> Result<ContainerDetails> {
        let state = self.lock("inspect")?;
        let index = state.position(name_or_id)?;
        Ok(state.containers[index].details.clone())
    }

    async fn run(&self, spec: &LaunchSpec) -> Result<ContainerRecord> {
        let details = details_from_spec(spec)?;
        let mut state = self.lock("create")?;
        if state.containers.iter().any(|e| e.details.name == spec.name) {
            return Err(conflict("create", &spec.name));
        }
        let record = details.record();
        state.containers.push(Entry {
            details,
            auto_remove: spec.remove,
        });
        state.runs += 1;
        Ok(record)
    }

    async fn start(&self, name_or_id: &str) -> Result<()> {
        let mut state = self.lock("start")?;
        let index = state.position(name_or_id)?;
        let details = &mut state.containers[index].details;
        details.status = RUNNING.to_string();
        details.started_at = now();
        Ok(())
    }

    async fn stop(&self, name_or_id: &str) -> Result<()> {
        let mut state = self.lock("stop")?;
        let index = state.position(name_or_id)?;
        if state.containers[index].auto_remove {
            let _ = state.containers.remove(index);
        } else {
            state.containers[index].details.status = EXITED.to_string();
        }
        Ok(())
    }

    async fn restart(&self, name_or_id: &str) -> Result<()> {
        self.start(name_or_id).await
    }

    async fn remove(&self, name_or_id: &str, force: bool) -> Result<()> {
        let mut state = self.lock("remove")?;
        let index = state.position(name_or_id)?;
        if state.containers[index].details.status == RUNNING && !force {
            return Err(BerthError::engine(
                "remove",
                format!("container {name_or_id:?} is running"),
            ));
        }
        let _ = state.containers.remove(index);
        Ok(())
    }

    async fn list_images(&self) -> Result<Vec<ImageRecord>> {
        Ok(self.lock("images")?.images.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, remove: bool) -> LaunchSpec {
        let mut spec = LaunchSpec::for_image("nginx:1.27");
        spec.name = name.to_string();
        spec.mem_limit = "512m".to_string();
        spec.nano_cpus = 1_000_000_000;
        spec.remove = remove;
        spec
    }

    #[tokio::test]
    async fn run_then_list_and_inspect() {
        let engine = MemoryEngine::new();
        let record = engine.run(&spec("bob", false)).await.unwrap();
        assert_eq!(record.short_id.len(), CONTAINER_SHORT_ID_LEN);

        let listed = engine.list_containers().await.unwrap();
        assert_eq!(listed, vec![record.clone()]);

        let details = engine.inspect(&record.short_id).await.unwrap();
        assert_eq!(details.status, "running");
        assert_eq!(details.memory_bytes, 512 * 1024 * 1024);
        assert_eq!(engine.run_count(), 1);
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let engine = MemoryEngine::new();
        let _ = engine.run(&spec("bob", false)).await.unwrap();
        let err = engine.run(&spec("bob", false)).await.unwrap_err();
        assert!(err.is_engine_failure());
        assert_eq!(engine.run_count(), 1);
    }

    #[tokio::test]
    async fn stop_removes_auto_remove_containers() {
        let engine = MemoryEngine::new();
        let _ = engine.run(&spec("keep", false)).await.unwrap();
        let _ = engine.run(&spec("gone", true)).await.unwrap();
        engine.stop("keep").await.unwrap();
        engine.stop("gone").await.unwrap();

        assert_eq!(engine.inspect("keep").await.unwrap().status, "exited");
        assert!(matches!(
            engine.inspect("gone").await,
            Err(BerthError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn running_container_needs_force_to_remove() {
        let engine = MemoryEngine::new();
        let _ = engine.run(&spec("bob", false)).await.unwrap();
        assert!(engine.remove("bob", false).await.is_err());
        engine.remove("bob", true).await.unwrap();
        assert!(engine.list_containers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn restart_marks_container_running() {
        let engine = MemoryEngine::new();
        let _ = engine.run(&spec("bob", false)).await.unwrap();
        engine.stop("bob").await.unwrap();
        engine.restart("bob").await.unwrap();
        assert_eq!(engine.inspect("bob").await.unwrap().status, "running");
    }
}
