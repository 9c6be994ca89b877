//! CPU and memory clamping against operator ceilings.
//!
//! Requests never fail here. Anything missing or malformed falls back to
//! [`DEFAULT_CPUS`] or [`DEFAULT_MEMORY`], and anything above a ceiling is
//! clamped to it.

use berth_common::config::BerthConfig;
use berth_common::constants::{DEFAULT_CPUS, DEFAULT_MEMORY, NANO_CPUS_PER_CPU};
use berth_common::error::{BerthError, Result};
use thiserror::Error;

/// Why a memory string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryParseError {
    /// The string was empty.
    #[error("empty memory value")]
    Empty,
    /// The last character is not one of `b`, `k`, `m`, `g`.
    #[error("unknown memory unit {0:?}")]
    UnknownUnit(char),
    /// The part before the unit is not a non-negative number.
    #[error("invalid memory amount {0:?}")]
    InvalidNumber(String),
}

/// Byte multiplier for a lowercase unit suffix.
const fn unit_multiplier(unit: char) -> Option<u64> {
    match unit {
        'b' => Some(1),
        'k' => Some(1024),
        'm' => Some(1024 * 1024),
        'g' => Some(1024 * 1024 * 1024),
        _ => None,
    }
}

/// Parses `<number><unit>` with unit in `b`, `k`, `m`, `g` (lowercase only).
///
/// The number may be fractional (`1.5g`); the result is rounded down to
/// whole bytes.
///
/// # Errors
///
/// Returns a [`MemoryParseError`] for an empty string, an unknown unit, or
/// a missing, negative or non-finite amount.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn parse_memory(value: &str) -> std::result::Result<u64, MemoryParseError> {
    let value = value.trim();
    let unit = value.chars().next_back().ok_or(MemoryParseError::Empty)?;
    let multiplier = unit_multiplier(unit).ok_or(MemoryParseError::UnknownUnit(unit))?;
    let amount = &value[..value.len() - unit.len_utf8()];
    let number: f64 = amount
        .trim()
        .parse()
        .map_err(|_| MemoryParseError::InvalidNumber(amount.to_string()))?;
    if !number.is_finite() || number < 0.0 {
        return Err(MemoryParseError::InvalidNumber(amount.to_string()));
    }
    Ok((number * multiplier as f64).floor() as u64)
}

/// Operator ceilings for per-container CPU and memory.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePolicy {
    max_cpus: f64,
    max_memory: String,
    max_memory_bytes: u64,
}

impl ResourcePolicy {
    /// Creates a policy, parsing the memory ceiling with the request rules.
    ///
    /// # Errors
    ///
    /// Returns [`BerthError::Config`] if the CPU ceiling is not positive or
    /// the memory ceiling does not parse.
    pub fn new(max_cpus: f64, max_memory: impl Into<String>) -> Result<Self> {
        let max_memory = max_memory.into();
        if !max_cpus.is_finite() || max_cpus <= 0.0 {
            return Err(BerthError::Config {
                message: format!("CPU ceiling must be positive, got {max_cpus}"),
            });
        }
        let max_memory_bytes = parse_memory(&max_memory).map_err(|e| BerthError::Config {
            message: format!("memory ceiling {max_memory:?}: {e}"),
        })?;
        Ok(Self {
            max_cpus,
            max_memory,
            max_memory_bytes,
        })
    }

    /// Creates a policy from the operator configuration.
    ///
    /// # Errors
    ///
    /// See [`ResourcePolicy::new`].
    pub fn from_config(config: &BerthConfig) -> Result<Self> {
        Self::new(config.max_cpus, config.max_memory.clone())
    }

    /// Returns the CPU ceiling.
    #[must_use]
    pub const fn max_cpus(&self) -> f64 {
        self.max_cpus
    }

    /// Returns the memory ceiling as configured.
    #[must_use]
    pub fn max_memory(&self) -> &str {
        &self.max_memory
    }

    /// Resolves a CPU request to engine-native nano-CPUs.
    ///
    /// Absent, non-finite or non-positive requests use [`DEFAULT_CPUS`];
    /// requests above the ceiling are clamped to it. The default itself is
    /// clamped when the ceiling is below one CPU.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn nano_cpus(&self, requested: Option<f64>) -> i64 {
        let cpus = match requested {
            Some(c) if c.is_finite() && c > 0.0 => c,
            Some(c) => {
                tracing::info!(requested = c, "unusable cpu request, using default");
                DEFAULT_CPUS
            }
            None => DEFAULT_CPUS,
        };
        let cpus = if cpus > self.max_cpus {
            tracing::info!(requested = cpus, ceiling = self.max_cpus, "cpu request clamped");
            self.max_cpus
        } else {
            cpus
        };
        (cpus * NANO_CPUS_PER_CPU).round() as i64
    }

    /// Resolves a memory request to a limit string with unit suffix.
    ///
    /// Absent or unparsable requests (including an unknown or upper-case
    /// unit) use [`DEFAULT_MEMORY`]; requests above the ceiling become the
    /// ceiling string exactly. Valid requests are passed through unchanged.
    #[must_use]
    pub fn mem_limit(&self, requested: Option<&str>) -> String {
        let Some(requested) = requested else {
            return self.default_memory();
        };
        match parse_memory(requested) {
            Ok(bytes) if bytes > self.max_memory_bytes => {
                tracing::info!(requested, ceiling = %self.max_memory, "memory request clamped");
                self.max_memory.clone()
            }
            Ok(_) => requested.trim().to_string(),
            Err(e) => {
                tracing::info!(requested, error = %e, "unusable memory request, using default");
                self.default_memory()
            }
        }
    }

    fn default_memory(&self) -> String {
        match parse_memory(DEFAULT_MEMORY) {
            Ok(bytes) if bytes > self.max_memory_bytes => self.max_memory.clone(),
            _ => DEFAULT_MEMORY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ResourcePolicy {
        ResourcePolicy::new(2.0, "4g").unwrap()
    }

    #[test]
    fn parse_memory_units() {
        assert_eq!(parse_memory("100b"), Ok(100));
        assert_eq!(parse_memory("2k"), Ok(2048));
        assert_eq!(parse_memory("512m"), Ok(512 * 1024 * 1024));
        assert_eq!(parse_memory("1g"), Ok(1024 * 1024 * 1024));
    }

    #[test]
    fn parse_memory_fractional_amount() {
        assert_eq!(parse_memory("1.5k"), Ok(1536));
    }

    #[test]
    fn parse_memory_rejects_upper_case_unit() {
        assert_eq!(parse_memory("512M"), Err(MemoryParseError::UnknownUnit('M')));
    }

    #[test]
    fn parse_memory_rejects_garbage() {
        assert_eq!(parse_memory(""), Err(MemoryParseError::Empty));
        assert!(matches!(parse_memory("m"), Err(MemoryParseError::InvalidNumber(_))));
        assert!(matches!(parse_memory("-1g"), Err(MemoryParseError::InvalidNumber(_))));
        assert!(matches!(parse_memory("infg"), Err(MemoryParseError::InvalidNumber(_))));
    }

    #[test]
    fn cpu_request_within_ceiling_is_kept() {
        assert_eq!(policy().nano_cpus(Some(1.5)), 1_500_000_000);
    }

    #[test]
    fn cpu_request_above_ceiling_is_clamped() {
        assert_eq!(policy().nano_cpus(Some(64.0)), 2_000_000_000);
    }

    #[test]
    fn missing_cpu_request_defaults_to_one() {
        assert_eq!(policy().nano_cpus(None), 1_000_000_000);
        assert_eq!(policy().nano_cpus(Some(f64::NAN)), 1_000_000_000);
        assert_eq!(policy().nano_cpus(Some(0.0)), 1_000_000_000);
    }

    #[test]
    fn default_cpu_respects_small_ceiling() {
        let policy = ResourcePolicy::new(0.5, "1g").unwrap();
        assert_eq!(policy.nano_cpus(None), 500_000_000);
    }

    #[test]
    fn memory_request_within_ceiling_is_kept() {
        assert_eq!(policy().mem_limit(Some("1g")), "1g");
    }

    #[test]
    fn memory_request_above_ceiling_becomes_ceiling() {
        assert_eq!(policy().mem_limit(Some("5000m")), "4g");
    }

    #[test]
    fn memory_with_unknown_unit_defaults() {
        assert_eq!(policy().mem_limit(Some("2t")), "512m");
        assert_eq!(policy().mem_limit(Some("2G")), "512m");
    }

    #[test]
    fn missing_or_malformed_memory_defaults() {
        assert_eq!(policy().mem_limit(None), "512m");
        assert_eq!(policy().mem_limit(Some("lotsm")), "512m");
        assert_eq!(policy().mem_limit(Some("")), "512m");
    }

    #[test]
    fn default_memory_respects_small_ceiling() {
        let policy = ResourcePolicy::new(1.0, "256m").unwrap();
        assert_eq!(policy.mem_limit(None), "256m");
    }

    #[test]
    fn invalid_ceilings_are_config_errors() {
        assert!(matches!(
            ResourcePolicy::new(1.0, "4x"),
            Err(BerthError::Config { .. })
        ));
        assert!(matches!(
            ResourcePolicy::new(-1.0, "4g"),
            Err(BerthError::Config { .. })
        ));
    }
}
