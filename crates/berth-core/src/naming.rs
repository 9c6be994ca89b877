//! Ownership, quota and per-caller container naming.
//!
//! Names are of the form `caller`, `caller1`, `caller2`, ... A container is
//! owned by a caller when its name starts with the caller identity, so the
//! name itself is the only ownership record.

use std::collections::HashSet;

use berth_common::error::{BerthError, Result};
use berth_common::types::CallerId;

/// Returns the names in `names` that belong to `caller`.
pub fn owned_names<'a, I>(caller: &CallerId, names: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().filter(|n| caller.owns(n)).collect()
}

/// Rejects a launch when `caller` already owns `limit` containers or more.
///
/// Returns the number of containers the caller owns. This is a check, not a
/// reservation: a concurrent launch may pass the same check.
///
/// # Errors
///
/// Returns [`BerthError::QuotaExceeded`] when the caller is at the limit.
pub fn check_quota<'a, I>(caller: &CallerId, names: I, limit: usize) -> Result<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let owned = owned_names(caller, names).len();
    if owned >= limit {
        tracing::warn!(%caller, owned, limit, "per-user container limit reached");
        return Err(BerthError::QuotaExceeded {
            caller: caller.to_string(),
            limit,
        });
    }
    Ok(owned)
}

/// Numeric suffix of an owned name: `""` is 0, digits parse, anything else is `None`.
fn ordinal(caller: &CallerId, name: &str) -> Option<u64> {
    let suffix = name.strip_prefix(caller.as_str())?;
    if suffix.is_empty() {
        return Some(0);
    }
    if !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Computes the next container name for `caller`.
///
/// `existing` is every container name known to the engine. With no owned
/// container the name is the caller identity itself; otherwise it is the
/// caller identity followed by one more than the highest numeric suffix
/// among owned names. Owned names with a non-numeric suffix (`bobby` for
/// caller `bob`) do not take part in numbering. The result never collides
/// with an existing name.
#[must_use]
pub fn next_name(caller: &CallerId, existing: &[&str]) -> String {
    let owned = owned_names(caller, existing.iter().copied());
    if owned.is_empty() {
        return caller.to_string();
    }

    let highest = owned
        .iter()
        .filter_map(|name| ordinal(caller, name))
        .max()
        .unwrap_or(0);

    let taken: HashSet<&str> = existing.iter().copied().collect();
    let mut counter = highest.saturating_add(1);
    loop {
        let candidate = format!("{caller}{counter}");
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        counter = counter.saturating_add(1);
    }
}
