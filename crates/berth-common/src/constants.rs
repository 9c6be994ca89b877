//! System-wide constants and defaults.

use std::time::Duration;

/// Caller identity used when a request carries no `username` header.
pub const DEFAULT_CALLER: &str = "system";

/// Request header carrying the caller identity.
pub const USERNAME_HEADER: &str = "username";

/// Request/response header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Default HTTP listen port.
pub const DEFAULT_LISTEN_PORT: u16 = 8000;

/// Engine-native CPU units per whole CPU.
pub const NANO_CPUS_PER_CPU: f64 = 1_000_000_000.0;

/// CPU allotment used when a request gives none (or gives garbage).
pub const DEFAULT_CPUS: f64 = 1.0;

/// Memory limit used when a request gives none (or gives garbage).
pub const DEFAULT_MEMORY: &str = "512m";

/// Connect timeout for a single port liveness probe.
pub const PORT_PROBE_TIMEOUT: Duration = Duration::from_millis(250);

/// Default bound on a single engine call, in seconds.
pub const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 30;

/// Command-line flag injected for the default image.
pub const PORT_FLAG: &str = "--port";

/// Length of a container short id, in hex characters.
pub const CONTAINER_SHORT_ID_LEN: usize = 12;

/// Length of an image short id digest, in hex characters (after `sha256:`).
pub const IMAGE_SHORT_ID_LEN: usize = 10;

/// Log options attached to every launched container.
pub const CONTAINER_LOG_OPTIONS: [(&str, &str); 4] = [
    ("mode", "non-blocking"),
    ("max-size", "10m"),
    ("max-file", "3"),
    ("max-buffer-size", "4m"),
];

/// Host paths mounted into default-image containers when present.
pub const DEFAULT_MOUNT_CANDIDATES: [&str; 7] = [
    "/opt/cloudera/parcels/CDH",
    "/etc/hadoop/conf",
    "/etc/hive/conf",
    "/etc/spark/conf",
    "/opt/cloudera/parcels/SPARK3",
    "/etc/krb5.conf",
    "/etc/ntp.conf",
];

/// Binary name for the daemon.
pub const BIN_NAME: &str = "berthd";
