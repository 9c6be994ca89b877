//! Caller-facing projections of containers and images.

use berth_common::constants::{NANO_CPUS_PER_CPU, PORT_FLAG};
use berth_common::types::{ContainerDetails, ImageRecord, MountPointInfo};
use serde::Serialize;

const MIB: f64 = 1024.0 * 1024.0;

/// Selected container attributes returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerInfo {
    /// Container name.
    #[serde(rename = "container name")]
    pub name: String,
    /// `<host>:<port>` when the application exposes a port.
    #[serde(rename = "application url", skip_serializing_if = "Option::is_none")]
    pub application_url: Option<String>,
    /// Short container id.
    #[serde(rename = "container id")]
    pub id: String,
    /// Runtime details.
    #[serde(rename = "container details")]
    pub details: ContainerSummary,
}

/// Runtime details nested in [`ContainerInfo`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSummary {
    /// Engine status.
    pub status: String,
    /// Creation timestamp.
    pub created: String,
    /// Last start timestamp.
    pub started_at: String,
    /// Image reference.
    pub image: String,
    /// Memory limit, whole megabytes (`512MB`).
    pub memory: String,
    /// CPU allotment in CPUs.
    pub cpus: f64,
    /// Attached mounts.
    pub mounts: Vec<MountPointInfo>,
}

impl ContainerInfo {
    /// Projects inspected details, advertising application URLs on `host`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn project(details: &ContainerDetails, host: &str) -> Self {
        Self {
            name: details.name.clone(),
            application_url: application_port(details).map(|port| format!("{host}:{port}")),
            id: details.short_id.clone(),
            details: ContainerSummary {
                status: details.status.clone(),
                created: details.created.clone(),
                started_at: details.started_at.clone(),
                image: details.image.clone(),
                memory: format!("{}MB", format_megabytes(details.memory_bytes, 0)),
                cpus: details.nano_cpus as f64 / NANO_CPUS_PER_CPU,
                mounts: details.mounts.clone(),
            },
        }
    }
}

/// Port the application listens on, if it can be told.
///
/// The value after `--port` in the container's arguments wins; otherwise the
/// first published host port, in container-port order.
#[must_use]
pub fn application_port(details: &ContainerDetails) -> Option<String> {
    let from_args = details
        .args
        .iter()
        .position(|a| a == PORT_FLAG)
        .and_then(|i| details.args.get(i + 1))
        .cloned();
    from_args
        .or_else(|| {
            details
                .published_ports
                .values()
                .find_map(|hosts| hosts.first().cloned())
        })
        .filter(|port| !port.is_empty() && port != "0")
}

/// Image attributes returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    /// Repository tags.
    pub tags: Vec<String>,
    /// Short image id.
    #[serde(rename = "short id")]
    pub short_id: String,
    /// Size in megabytes with two decimals (`1,234.57MB`).
    pub size: String,
    /// Creation time in epoch seconds.
    pub created: i64,
}

impl From<&ImageRecord> for ImageInfo {
    fn from(record: &ImageRecord) -> Self {
        Self {
            tags: record.tags.clone(),
            short_id: record.short_id.clone(),
            size: format!("{}MB", format_megabytes(record.size_bytes, 2)),
            created: record.created,
        }
    }
}

/// Formats a byte count as megabytes with thousands separators.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_megabytes(bytes: i64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, bytes as f64 / MIB);
    let (sign, unsigned) = formatted
        .strip_prefix('-')
        .map_or(("", formatted.as_str()), |rest| ("-", rest));
    let (whole, fraction) = unsigned
        .split_once('.')
        .map_or((unsigned, None), |(w, f)| (w, Some(f)));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    match fraction {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}
