//! Resolution of caller input to exactly one owned container.
//!
//! Callers may name a container or give its id. Engine short ids have no
//! fixed length, so an id matches when either side is a prefix of the other.
//! When several owned containers match, the first in engine listing order
//! wins; there is no further tie-break.

use berth_common::request::Selector;
use berth_common::types::{CallerId, ContainerRecord};

/// Returns whether two container ids denote the same container.
///
/// Either id may be truncated: `a1b2` matches `a1b2c3d4` and vice versa.
/// An empty id never matches.
#[must_use]
pub fn ids_overlap(supplied: &str, stored: &str) -> bool {
    if supplied.is_empty() || stored.is_empty() {
        return false;
    }
    supplied.starts_with(stored) || stored.starts_with(supplied)
}

/// Returns whether `record` is the container `selector` designates.
#[must_use]
pub fn matches(selector: &Selector, record: &ContainerRecord) -> bool {
    match selector {
        Selector::Name(name) => record.name == *name,
        Selector::Id(id) => ids_overlap(id, &record.short_id),
    }
}

/// Finds the first container owned by `caller` that `selector` designates.
pub fn resolve<'a>(
    caller: &CallerId,
    selector: &Selector,
    records: &'a [ContainerRecord],
) -> Option<&'a ContainerRecord> {
    let found = records
        .iter()
        .filter(|r| caller.owns(&r.name))
        .find(|r| matches(selector, r));
    match found {
        Some(record) => {
            tracing::debug!(%caller, name = %record.name, id = %record.short_id, "container resolved");
        }
        None => tracing::debug!(%caller, ?selector, "no owned container matches"),
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, short_id: &str) -> ContainerRecord {
        ContainerRecord {
            name: name.to_string(),
            short_id: short_id.to_string(),
        }
    }

    fn fleet() -> Vec<ContainerRecord> {
        vec![
            record("alice", "a1b2c3d4e5f6"),
            record("bob", "b0b0b0b0b0b0"),
            record("bob1", "b1b1b1b1b1b1"),
        ]
    }

    #[test]
    fn supplied_id_shorter_than_stored() {
        assert!(ids_overlap("a1b2", "a1b2c3d4"));
    }

    #[test]
    fn stored_id_shorter_than_supplied() {
        assert!(ids_overlap("a1b2c3d4e5f6a7b8c9", "a1b2c3d4"));
    }

    #[test]
    fn diverging_ids_do_not_overlap() {
        assert!(!ids_overlap("a1b3", "a1b2c3d4"));
        assert!(!ids_overlap("", "a1b2"));
    }

    #[test]
    fn resolves_by_exact_name() {
        let fleet = fleet();
        let found = resolve(&CallerId::new("bob"), &Selector::Name("bob1".into()), &fleet);
        assert_eq!(found.map(|r| r.short_id.as_str()), Some("b1b1b1b1b1b1"));
    }

    #[test]
    fn name_must_match_exactly() {
        let fleet = fleet();
        assert!(resolve(&CallerId::new("bob"), &Selector::Name("bob2".into()), &fleet).is_none());
    }

    #[test]
    fn resolves_by_truncated_id() {
        let fleet = fleet();
        let found = resolve(&CallerId::new("bob"), &Selector::Id("b1b1".into()), &fleet);
        assert_eq!(found.map(|r| r.name.as_str()), Some("bob1"));
    }

    #[test]
    fn resolves_by_overlong_id() {
        let fleet = fleet();
        let found = resolve(
            &CallerId::new("alice"),
            &Selector::Id("a1b2c3d4e5f6deadbeef".into()),
            &fleet,
        );
        assert_eq!(found.map(|r| r.name.as_str()), Some("alice"));
    }

    #[test]
    fn never_resolves_another_callers_container() {
        let fleet = fleet();
        assert!(resolve(&CallerId::new("bob"), &Selector::Id("a1b2".into()), &fleet).is_none());
        assert!(
            resolve(&CallerId::new("bob"), &Selector::Name("alice".into()), &fleet).is_none()
        );
    }

    #[test]
    fn first_match_in_listing_order_wins() {
        let fleet = vec![record("bob", "abc111"), record("bob1", "abc222")];
        let found = resolve(&CallerId::new("bob"), &Selector::Id("abc".into()), &fleet);
        assert_eq!(found.map(|r| r.name.as_str()), Some("bob"));
    }
}
