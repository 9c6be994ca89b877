//! Process-wide log verbosity.
//!
//! Any request may carry a `loglevel` field; the new level persists for every
//! later request until another one changes it. The level lives in a single
//! atomic updated by compare-and-swap, and concurrent writers race with last
//! write wins. The subscriber installed by the binary consults [`enabled`] on
//! every event.

use std::sync::atomic::{AtomicU8, Ordering};

use tracing::level_filters::LevelFilter;
use tracing::{Level, Metadata};

const WARN_CODE: u8 = 2;

static LEVEL: AtomicU8 = AtomicU8::new(WARN_CODE);

fn encode(filter: LevelFilter) -> u8 {
    match filter.into_level() {
        None => 0,
        Some(Level::ERROR) => 1,
        Some(Level::WARN) => WARN_CODE,
        Some(Level::INFO) => 3,
        Some(Level::DEBUG) => 4,
        Some(Level::TRACE) => 5,
    }
}

const fn decode(code: u8) -> LevelFilter {
    match code {
        0 => LevelFilter::OFF,
        1 => LevelFilter::ERROR,
        WARN_CODE => LevelFilter::WARN,
        3 => LevelFilter::INFO,
        4 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Returns the current process-wide level.
#[must_use]
pub fn current() -> LevelFilter {
    decode(LEVEL.load(Ordering::Acquire))
}

/// Replaces the process-wide level and returns the previous one.
pub fn set(level: LevelFilter) -> LevelFilter {
    let next = encode(level);
    let previous = LEVEL
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |_| Some(next))
        .unwrap_or_else(|prev| prev);
    decode(previous)
}

/// Returns whether an event or span with this metadata should be recorded.
#[must_use]
pub fn enabled(metadata: &Metadata<'_>) -> bool {
    *metadata.level() <= current()
}

/// Parses a `loglevel` request value.
///
/// Accepts the numeric levels 10/20/30/40/50 and the names DEBUG, INFO,
/// WARNING, ERROR and CRITICAL in any case. CRITICAL maps to ERROR.
#[must_use]
pub fn parse(value: &serde_json::Value) -> Option<LevelFilter> {
    match value {
        serde_json::Value::Number(n) => match n.as_u64()? {
            10 => Some(LevelFilter::DEBUG),
            20 => Some(LevelFilter::INFO),
            30 => Some(LevelFilter::WARN),
            40 | 50 => Some(LevelFilter::ERROR),
            _ => None,
        },
        serde_json::Value::String(s) => parse_name(s),
        _ => None,
    }
}

/// Parses a level name as used in the configuration file.
#[must_use]
pub fn parse_name(name: &str) -> Option<LevelFilter> {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Some(LevelFilter::TRACE),
        "DEBUG" => Some(LevelFilter::DEBUG),
        "INFO" => Some(LevelFilter::INFO),
        "WARNING" | "WARN" => Some(LevelFilter::WARN),
        "ERROR" | "CRITICAL" => Some(LevelFilter::ERROR),
        _ => None,
    }
}
