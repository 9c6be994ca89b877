//! Domain primitive types used across the berth workspace.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{CONTAINER_LOG_OPTIONS, DEFAULT_CALLER};

/// Identity string used to namespace container names.
///
/// Ownership is string-prefix membership: a container belongs to a caller
/// when its name starts with the caller identity. The identity is taken from
/// a request header and is not authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerId(String);

impl CallerId {
    /// Creates a caller identity from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the caller from an optional header value.
    ///
    /// A missing or blank header maps to [`DEFAULT_CALLER`]; a blank identity
    /// would otherwise prefix-match every container on the host.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => Self(v.to_string()),
            _ => Self(DEFAULT_CALLER.to_string()),
        }
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether a container name falls in this caller's namespace.
    #[must_use]
    pub fn owns(&self, container_name: &str) -> bool {
        container_name.starts_with(&self.0)
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A container as listed by the engine. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Container name, without the engine's leading `/`.
    pub name: String,
    /// Engine-assigned abbreviated identifier.
    pub short_id: String,
}

/// A mount as reported by the engine for an existing container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPointInfo {
    /// Mount type (`bind`, `volume`, ...).
    #[serde(rename = "Type")]
    pub kind: String,
    /// Host-side source path.
    #[serde(rename = "Source")]
    pub source: String,
    /// Path inside the container.
    #[serde(rename = "Destination")]
    pub destination: String,
    /// Mount mode string.
    #[serde(rename = "Mode")]
    pub mode: String,
    /// Whether the mount is writable.
    #[serde(rename = "RW")]
    pub rw: bool,
}

/// Inspected attributes of a single container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerDetails {
    /// Container name, without the engine's leading `/`.
    pub name: String,
    /// Engine-assigned abbreviated identifier.
    pub short_id: String,
    /// Engine status string (`created`, `running`, `exited`, ...).
    pub status: String,
    /// Creation timestamp as reported by the engine.
    pub created: String,
    /// Last start timestamp as reported by the engine.
    pub started_at: String,
    /// Image reference the container was created from.
    pub image: String,
    /// Memory limit in bytes (0 when unlimited).
    pub memory_bytes: i64,
    /// CPU allotment in engine-native units (0 when unlimited).
    pub nano_cpus: i64,
    /// Arguments passed to the container entrypoint.
    pub args: Vec<String>,
    /// Published ports: container port key to host ports.
    pub published_ports: BTreeMap<String, Vec<String>>,
    /// Mounts attached to the container.
    pub mounts: Vec<MountPointInfo>,
}

impl ContainerDetails {
    /// Returns the listing record for these details.
    #[must_use]
    pub fn record(&self) -> ContainerRecord {
        ContainerRecord {
            name: self.name.clone(),
            short_id: self.short_id.clone(),
        }
    }
}

/// An image known to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Repository tags.
    pub tags: Vec<String>,
    /// Abbreviated image id (`sha256:` plus a digest prefix).
    pub short_id: String,
    /// Image size in bytes.
    pub size_bytes: i64,
    /// Creation time in seconds since the Unix epoch, as the engine reports it.
    pub created: i64,
}

/// Network mode of a launched container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// Share the host network stack.
    Host,
    /// Engine default bridge network.
    #[default]
    Bridge,
    /// Multi-host overlay network.
    Overlay,
}

impl NetworkMode {
    /// Parses a caller-supplied mode; anything unrecognised is `Bridge`.
    #[must_use]
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value {
            Some("host") => Self::Host,
            Some("overlay") => Self::Overlay,
            _ => Self::Bridge,
        }
    }

    /// Returns the engine-native mode string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Bridge => "bridge",
            Self::Overlay => "overlay",
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bind mount to attach at launch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MountSpec {
    /// Host path.
    #[serde(alias = "Source")]
    pub source: String,
    /// Path inside the container.
    #[serde(alias = "Target")]
    pub target: String,
    /// Whether the mount is read-only.
    #[serde(default, alias = "ReadOnly")]
    pub read_only: bool,
}

impl MountSpec {
    /// Read-only bind mount of a host path at the same path.
    #[must_use]
    pub fn read_only_bind(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            source: path.clone(),
            target: path,
            read_only: true,
        }
    }
}

/// Port mappings: container port (`8080` or `8080/tcp`) to host port.
///
/// A `None` host port asks the engine to pick one.
pub type PortMap = BTreeMap<String, Option<u16>>;

/// Lifecycle action on an existing container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerAction {
    /// Start a stopped container.
    Start,
    /// Stop a running container.
    Stop,
    /// Restart a container.
    Restart,
}

impl ContainerAction {
    /// Parses an action name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "restart" => Some(Self::Restart),
            _ => None,
        }
    }

    /// Returns the lowercase action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the engine needs to create and start one container.
///
/// Built fresh per launch request and discarded after the engine call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchSpec {
    /// Image reference.
    pub image: String,
    /// Container name, unique among all containers known to the engine.
    pub name: String,
    /// Command line, if any.
    pub command: Option<Vec<String>>,
    /// Network mode.
    pub network_mode: NetworkMode,
    /// Port mappings, only honoured when the mode is not `host`.
    pub ports: PortMap,
    /// Bind mounts.
    pub mounts: Vec<MountSpec>,
    /// CPU allotment in engine-native units.
    pub nano_cpus: i64,
    /// Memory limit with unit suffix (`512m`).
    pub mem_limit: String,
    /// Whether the engine deletes the container when it stops.
    pub remove: bool,
    /// Engine log driver options.
    pub log_options: BTreeMap<String, String>,
    /// Kernel swappiness for the container's memory cgroup.
    pub memory_swappiness: i64,
    /// Run an init process as PID 1.
    pub init: bool,
    /// Return as soon as the container is started.
    pub detach: bool,
    /// Allocate a pseudo-TTY.
    pub tty: bool,
}

impl LaunchSpec {
    /// Creates a spec for `image` with the fixed operational fields set.
    #[must_use]
    pub fn for_image(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            name: String::new(),
            command: None,
            network_mode: NetworkMode::default(),
            ports: PortMap::new(),
            mounts: Vec::new(),
            nano_cpus: 0,
            mem_limit: String::new(),
            remove: true,
            log_options: CONTAINER_LOG_OPTIONS
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            memory_swappiness: 0,
            init: true,
            detach: true,
            tty: true,
        }
    }
}
