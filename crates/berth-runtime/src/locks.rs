//! Per-caller launch serialization.
//!
//! The quota check and the engine run are separate engine calls. Holding a
//! caller's lock across both keeps two launches from the same caller from
//! passing the same quota check inside this process. Launches by other
//! processes sharing the engine are not covered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use berth_common::types::CallerId;
use tokio::sync::OwnedMutexGuard;

/// Lazily created async mutexes keyed by caller.
#[derive(Debug, Default)]
pub struct CallerLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl CallerLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and holds `caller`'s launch lock until the guard drops.
    pub async fn acquire(&self, caller: &CallerId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = match self.inner.lock() {
                Ok(table) => table,
                Err(poisoned) => poisoned.into_inner(),
            };
            // Entries only referenced by the table are idle.
            table.retain(|key, lock| key == caller.as_str() || Arc::strong_count(lock) > 1);
            Arc::clone(
                table
                    .entry(caller.as_str().to_string())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Number of callers with a lock entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map_or(0, |table| table.len())
    }

    /// Whether no caller has a lock entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_caller_waits_for_the_holder() {
        let locks = Arc::new(CallerLocks::new());
        let alice = CallerId::new("alice");
        let guard = locks.acquire(&alice).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            let alice = alice.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&alice).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn other_callers_do_not_block() {
        let locks = CallerLocks::new();
        let _alice = locks.acquire(&CallerId::new("alice")).await;
        let bob = tokio::time::timeout(
            Duration::from_millis(200),
            locks.acquire(&CallerId::new("bob")),
        )
        .await;
        assert!(bob.is_ok());
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = CallerLocks::new();
        drop(locks.acquire(&CallerId::new("alice")).await);
        drop(locks.acquire(&CallerId::new("bob")).await);
        assert_eq!(locks.len(), 1);
    }
}
