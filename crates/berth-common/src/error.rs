//! Unified error types for the berth workspace.
//!
//! Field-level request problems never become errors: they are absorbed by
//! lenient deserialization into documented defaults. Everything that can
//! reach a caller or abort startup is a variant here.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum BerthError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// The caller already owns the maximum number of containers.
    #[error("caller {caller} already owns {limit} container(s)")]
    QuotaExceeded {
        /// Caller identity that hit the limit.
        caller: String,
        /// Configured per-user maximum.
        limit: usize,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A lifecycle action outside start/stop/restart was requested.
    #[error("unsupported action: {action}")]
    UnsupportedAction {
        /// The action as supplied by the caller.
        action: String,
    },

    /// Every port in the configured range is accepting connections.
    #[error("no free port on {host} in range {low}..{high}")]
    PortExhausted {
        /// Probed host address.
        host: String,
        /// Inclusive lower bound of the range.
        low: u16,
        /// Exclusive upper bound of the range.
        high: u16,
    },

    /// The container engine rejected or failed an operation.
    #[error("engine {operation} failed: {message}")]
    Engine {
        /// Engine primitive that failed.
        operation: &'static str,
        /// Engine-native error text (logged, never sent to callers).
        message: String,
    },

    /// An engine call did not complete within the configured bound.
    #[error("engine {operation} timed out after {seconds}s")]
    EngineTimeout {
        /// Engine primitive that timed out.
        operation: &'static str,
        /// Configured timeout in seconds.
        seconds: u64,
    },

    /// The YAML configuration document could not be parsed.
    #[error("configuration parse error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl BerthError {
    /// Builds an [`BerthError::Engine`] from any displayable engine error.
    pub fn engine(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Engine {
            operation,
            message: err.to_string(),
        }
    }

    /// Returns `true` for failures originating in the container engine.
    #[must_use]
    pub const fn is_engine_failure(&self) -> bool {
        matches!(self, Self::Engine { .. } | Self::EngineTimeout { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, BerthError>;
