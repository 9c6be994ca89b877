//! Docker-compatible engine backend over `bollard`.
//!
//! Every call is bounded by the configured timeout; an expired call surfaces
//! as [`BerthError::EngineTimeout`] instead of hanging the request.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use berth_common::constants::{CONTAINER_SHORT_ID_LEN, IMAGE_SHORT_ID_LEN};
use berth_common::error::{BerthError, Result};
use berth_common::types::{
    ContainerDetails, ContainerRecord, ImageRecord, LaunchSpec, MountPointInfo, NetworkMode,
};
use berth_core::resources::parse_memory;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, RestartContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::image::ListImagesOptions;
use bollard::models::{
    ContainerInspectResponse, HostConfig, HostConfigLogConfig, ImageSummary, Mount, MountTypeEnum,
    PortBinding,
};

use crate::engine::ContainerEngine;

/// Engine backend talking to the local Docker daemon.
pub struct DockerEngine {
    docker: Docker,
    timeout: Duration,
}

impl DockerEngine {
    /// Connects with the platform's local defaults (socket or named pipe).
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be configured.
    pub fn connect(timeout: Duration) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| BerthError::engine("connect", e))?
            .with_timeout(timeout);
        Ok(Self { docker, timeout })
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, bollard::errors::Error>> + Send,
    {
        bounded_call(self.timeout, operation, call).await
    }
}

/// Runs one engine call under `timeout`, mapping its error.
async fn bounded_call<T, F>(timeout: Duration, operation: &'static str, call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, bollard::errors::Error>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(map_error(operation, e)),
        Err(_) => Err(BerthError::EngineTimeout {
            operation,
            seconds: timeout.as_secs(),
        }),
    }
}

fn map_error(operation: &'static str, err: bollard::errors::Error) -> BerthError {
    match err {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message,
        } => BerthError::NotFound {
            kind: "container",
            id: message,
        },
        other => BerthError::engine(operation, other),
    }
}

/// First characters of a full container id.
fn short_container_id(id: &str) -> String {
    id.chars().take(CONTAINER_SHORT_ID_LEN).collect()
}

/// `sha256:` plus the first characters of the digest.
fn short_image_id(id: &str) -> String {
    let digest = id.strip_prefix("sha256:").unwrap_or(id);
    let prefix: String = digest.chars().take(IMAGE_SHORT_ID_LEN).collect();
    format!("sha256:{prefix}")
}

/// Container port key with an explicit protocol.
fn port_key(key: &str) -> String {
    if key.contains('/') {
        key.to_string()
    } else {
        format!("{key}/tcp")
    }
}

/// Translates a launch specification into the engine's create payload.
fn container_config(spec: &LaunchSpec) -> Result<Config<String>> {
    let memory = parse_memory(&spec.mem_limit)
        .ok()
        .and_then(|bytes| i64::try_from(bytes).ok())
        .ok_or_else(|| BerthError::Config {
            message: format!("unusable memory limit {:?}", spec.mem_limit),
        })?;

    let mounts = spec
        .mounts
        .iter()
        .map(|m| Mount {
            target: Some(m.target.clone()),
            source: Some(m.source.clone()),
            typ: Some(MountTypeEnum::BIND),
            read_only: Some(m.read_only),
            ..Default::default()
        })
        .collect();

    let mut host_config = HostConfig {
        nano_cpus: Some(spec.nano_cpus),
        memory: Some(memory),
        memory_swappiness: Some(spec.memory_swappiness),
        init: Some(spec.init),
        auto_remove: Some(spec.remove),
        network_mode: Some(spec.network_mode.as_str().to_string()),
        mounts: Some(mounts),
        log_config: Some(HostConfigLogConfig {
            typ: None,
            config: Some(spec.log_options.clone().into_iter().collect()),
        }),
        ..Default::default()
    };

    let mut exposed_ports = None;
    if spec.network_mode != NetworkMode::Host && !spec.ports.is_empty() {
        let mut bindings = HashMap::new();
        let mut exposed = HashMap::new();
        for (container_port, host_port) in &spec.ports {
            let key = port_key(container_port);
            let _ = bindings.insert(
                key.clone(),
                Some(vec![PortBinding {
                    host_ip: None,
                    host_port: host_port.map(|p| p.to_string()),
                }]),
            );
            let _ = exposed.insert(key, HashMap::new());
        }
        host_config.port_bindings = Some(bindings);
        exposed_ports = Some(exposed);
    }

    Ok(Config {
        image: Some(spec.image.clone()),
        cmd: spec.command.clone(),
        tty: Some(spec.tty),
        attach_stdout: Some(!spec.detach),
        attach_stderr: Some(!spec.detach),
        exposed_ports,
        host_config: Some(host_config),
        ..Default::default()
    })
}

/// Projects an inspect response onto the engine-neutral details.
fn details_from_inspect(response: ContainerInspectResponse) -> ContainerDetails {
    let state = response.state.unwrap_or_default();
    let host_config = response.host_config.unwrap_or_default();
    let published_ports = response
        .network_settings
        .and_then(|n| n.ports)
        .unwrap_or_default()
        .into_iter()
        .map(|(port, bindings)| {
            let hosts = bindings
                .unwrap_or_default()
                .into_iter()
                .filter_map(|b| b.host_port)
                .collect();
            (port, hosts)
        })
        .collect();
    let mounts = response
        .mounts
        .unwrap_or_default()
        .into_iter()
        .map(|m| MountPointInfo {
            kind: m.typ.map(|t| t.to_string()).unwrap_or_default(),
            source: m.source.unwrap_or_default(),
            destination: m.destination.unwrap_or_default(),
            mode: m.mode.unwrap_or_default(),
            rw: m.rw.unwrap_or_default(),
        })
        .collect();

    ContainerDetails {
        name: response
            .name
            .unwrap_or_default()
            .trim_start_matches('/')
            .to_string(),
        short_id: short_container_id(&response.id.unwrap_or_default()),
        status: state.status.map(|s| s.to_string()).unwrap_or_default(),
        created: response.created.unwrap_or_default(),
        started_at: state.started_at.unwrap_or_default(),
        image: response.config.and_then(|c| c.image).unwrap_or_default(),
        memory_bytes: host_config.memory.unwrap_or_default(),
        nano_cpus: host_config.nano_cpus.unwrap_or_default(),
        args: response.args.unwrap_or_default(),
        published_ports,
        mounts,
    }
}

fn image_record(summary: ImageSummary) -> ImageRecord {
    ImageRecord {
        tags: summary.repo_tags,
        short_id: short_image_id(&summary.id),
        size_bytes: summary.size,
        created: summary.created,
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn list_containers(&self) -> Result<Vec<ContainerRecord>> {
        let options = ListContainersOptions::<String> {
            all: true,
            ..Default::default()
        };
        let summaries = self
            .bounded("list", self.docker.list_containers(Some(options)))
            .await?;
        Ok(summaries
            .into_iter()
            .filter_map(|s| {
                let name = s.names?.into_iter().next()?;
                Some(ContainerRecord {
                    name: name.trim_start_matches('/').to_string(),
                    short_id: short_container_id(&s.id.unwrap_or_default()),
                })
            })
            .collect())
    }

    async fn inspect(&self, name_or_id: &str) -> Result<ContainerDetails> {
        let response = self
            .bounded(
                "inspect",
                self.docker
                    .inspect_container(name_or_id, None::<InspectContainerOptions>),
            )
            .await?;
        Ok(details_from_inspect(response))
    }

    async fn run(&self, spec: &LaunchSpec) -> Result<ContainerRecord> {
        let config = container_config(spec)?;
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };
        let created = self
            .bounded("create", self.docker.create_container(Some(options), config))
            .await?;
        for warning in &created.warnings {
            tracing::warn!(name = %spec.name, warning = %warning, "engine warning on create");
        }
        self.bounded(
            "start",
            self.docker
                .start_container(&created.id, None::<StartContainerOptions<String>>),
        )
        .await?;
        Ok(ContainerRecord {
            name: spec.name.clone(),
            short_id: short_container_id(&created.id),
        })
    }

    async fn start(&self, name_or_id: &str) -> Result<()> {
        self.bounded(
            "start",
            self.docker
                .start_container(name_or_id, None::<StartContainerOptions<String>>),
        )
        .await
    }

    async fn stop(&self, name_or_id: &str) -> Result<()> {
        self.bounded(
            "stop",
            self.docker
                .stop_container(name_or_id, None::<StopContainerOptions>),
        )
        .await
    }

    async fn restart(&self, name_or_id: &str) -> Result<()> {
        self.bounded(
            "restart",
            self.docker
                .restart_container(name_or_id, None::<RestartContainerOptions>),
        )
        .await
    }

    async fn remove(&self, name_or_id: &str, force: bool) -> Result<()> {
        let options = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        self.bounded(
            "remove",
            self.docker.remove_container(name_or_id, Some(options)),
        )
        .await
    }

    async fn list_images(&self) -> Result<Vec<ImageRecord>> {
        let summaries = self
            .bounded(
                "images",
                self.docker
                    .list_images(Some(ListImagesOptions::<String>::default())),
            )
            .await?;
        Ok(summaries.into_iter().map(image_record).collect())
    }
}
