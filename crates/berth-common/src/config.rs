//! Operator configuration, loaded from a YAML file.
//!
//! Keys keep the upper-case names operators already use in `config.yml`.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ENGINE_TIMEOUT_SECS, DEFAULT_LISTEN_PORT, DEFAULT_MOUNT_CANDIDATES};
use crate::error::{BerthError, Result};

/// Root configuration for the berth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BerthConfig {
    /// Reject requests that carry no `username` header.
    #[serde(rename = "HEADERTOKEN")]
    pub require_username: bool,
    /// CPU ceiling per container.
    #[serde(rename = "MAXCPU")]
    pub max_cpus: f64,
    /// Memory ceiling per container, `<number><b|k|m|g>`.
    #[serde(rename = "MAXMEM")]
    pub max_memory: String,
    /// Maximum live containers per caller.
    #[serde(rename = "MAX_PER_USER")]
    pub max_per_user: usize,
    /// Default workload image.
    #[serde(rename = "DEFAULTIMG")]
    pub default_image: String,
    /// First port probed for default-image launches.
    #[serde(rename = "MINPRT")]
    pub min_port: u16,
    /// Exclusive end of the probed port range.
    #[serde(rename = "MAXPRT")]
    pub max_port: u16,
    /// Initial log verbosity.
    #[serde(rename = "LOGLEVEL")]
    pub log_level: String,
    /// Program placed before `--port N` for the default image.
    #[serde(rename = "LAUNCHER")]
    pub launcher: Option<String>,
    /// Host paths bind-mounted into default-image containers when present.
    #[serde(rename = "DEFAULT_MOUNTS")]
    pub default_mounts: Vec<PathBuf>,
    /// Also mount the host Java runtime into default-image containers.
    #[serde(rename = "JAVA_MOUNTS")]
    pub java_mounts: bool,
    /// Host name advertised in application URLs; discovered when absent.
    #[serde(rename = "HOST")]
    pub host: Option<String>,
    /// Host address used for port probing and listening; resolved when absent.
    #[serde(rename = "HOSTIP")]
    pub host_ip: Option<IpAddr>,
    /// HTTP listen port.
    #[serde(rename = "PORT")]
    pub listen_port: u16,
    /// Bound on a single engine call, in seconds.
    #[serde(rename = "ENGINE_TIMEOUT")]
    pub engine_timeout_secs: u64,
    /// Serialize each caller's quota check and container creation.
    #[serde(rename = "SERIALIZE_LAUNCHES")]
    pub serialize_launches: bool,
}

impl Default for BerthConfig {
    fn default() -> Self {
        Self {
            require_username: false,
            max_cpus: 2.0,
            max_memory: "4g".to_string(),
            max_per_user: 3,
            default_image: "base:latest".to_string(),
            min_port: 8100,
            max_port: 8200,
            log_level: "WARNING".to_string(),
            launcher: None,
            default_mounts: DEFAULT_MOUNT_CANDIDATES.iter().map(PathBuf::from).collect(),
            java_mounts: true,
            host: None,
            host_ip: None,
            listen_port: DEFAULT_LISTEN_PORT,
            engine_timeout_secs: DEFAULT_ENGINE_TIMEOUT_SECS,
            serialize_launches: true,
        }
    }
}

impl BerthConfig {
    /// Loads and validates configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails [`BerthConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| BerthError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parses and validates configuration from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid YAML or fails validation.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants the decision engine relies on.
    ///
    /// The memory ceiling format is checked by the resource policy, which owns
    /// the unit parser.
    ///
    /// # Errors
    ///
    /// Returns [`BerthError::Config`] describing the first violated rule.
    pub fn validate(&self) -> Result<()> {
        if self.min_port >= self.max_port {
            return Err(BerthError::Config {
                message: format!(
                    "port range MINPRT={} .. MAXPRT={} is empty",
                    self.min_port, self.max_port
                ),
            });
        }
        if !self.max_cpus.is_finite() || self.max_cpus <= 0.0 {
            return Err(BerthError::Config {
                message: format!("MAXCPU must be a positive number, got {}", self.max_cpus),
            });
        }
        if self.max_per_user == 0 {
            return Err(BerthError::Config {
                message: "MAX_PER_USER must be at least 1".to_string(),
            });
        }
        if self.default_image.trim().is_empty() {
            return Err(BerthError::Config {
                message: "DEFAULTIMG must name an image".to_string(),
            });
        }
        if self.engine_timeout_secs == 0 {
            return Err(BerthError::Config {
                message: "ENGINE_TIMEOUT must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn loads_operator_keys() {
        let config = BerthConfig::from_yaml(
            "HEADERTOKEN: true\nMAXCPU: 4\nMAXMEM: 8g\nMAX_PER_USER: 2\n\
             DEFAULTIMG: ml:latest\nMINPRT: 9000\nMAXPRT: 9010\nLOGLEVEL: debug\n",
        )
        .unwrap();
        assert!(config.require_username);
        assert!((config.max_cpus - 4.0).abs() < f64::EPSILON);
        assert_eq!(config.max_memory, "8g");
        assert_eq!(config.max_per_user, 2);
        assert_eq!(config.default_image, "ml:latest");
        assert_eq!((config.min_port, config.max_port), (9000, 9010));
        assert_eq!(config.listen_port, DEFAULT_LISTEN_PORT);
    }

    #[test]
    fn missing_keys_take_defaults() {
        let config = BerthConfig::from_yaml("MAX_PER_USER: 5\n").unwrap();
        assert_eq!(config.max_per_user, 5);
        assert_eq!(config.max_memory, "4g");
        assert!(config.serialize_launches);
    }

    #[test]
    fn empty_port_range_is_rejected() {
        let err = BerthConfig::from_yaml("MINPRT: 9000\nMAXPRT: 9000\n").unwrap_err();
        assert!(matches!(err, BerthError::Config { .. }));
    }

    #[test]
    fn non_positive_cpu_ceiling_is_rejected() {
        let err = BerthConfig::from_yaml("MAXCPU: 0\n").unwrap_err();
        assert!(err.to_string().contains("MAXCPU"));
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let err = BerthConfig::from_yaml("MAXCPU: [unterminated").unwrap_err();
        assert!(matches!(err, BerthError::Yaml { .. }));
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "DEFAULTIMG: worker:1\nHOSTIP: 127.0.0.1").unwrap();
        let config = BerthConfig::load(file.path()).unwrap();
        assert_eq!(config.default_image, "worker:1");
        assert_eq!(config.host_ip, Some(IpAddr::from([127, 0, 0, 1])));
    }

    #[test]
    fn shipped_example_matches_defaults() {
        let example = BerthConfig::from_yaml(include_str!("../../../config.example.yml")).unwrap();
        assert_eq!(example, BerthConfig::default());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = BerthConfig::load(Path::new("/nonexistent/berth.yml")).unwrap_err();
        assert!(matches!(err, BerthError::Io { .. }));
    }
}
