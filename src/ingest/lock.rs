//! Per-feed mutual exclusion.
//!
//! Two ingestion runs for the same feed must not interleave their
//! read-stored-links and insert steps, or both could store the same link.
//! Runs for different feeds proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Held while a feed is being ingested; dropping it releases the feed.
pub struct FeedLockGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Registry of one async mutex per feed ID.
#[derive(Clone, Default)]
pub struct FeedLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>,
}

impl FeedLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other run holds `feed_id`, then hold it.
    pub async fn acquire(&self, feed_id: i64) -> FeedLockGuard {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            // Entries only the map references are neither held nor awaited.
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(feed_id).or_default().clone()
        };

        FeedLockGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of feeds with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl std::fmt::Debug for FeedLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedLocks")
            .field("tracked", &self.tracked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_feed_is_exclusive() {
        let locks = FeedLocks::new();
        let guard = locks.acquire(1).await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _guard = other.acquire(1).await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_feeds_do_not_block() {
        let locks = FeedLocks::new();
        let _a = locks.acquire(1).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2)).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let locks = FeedLocks::new();
        for id in 0..10 {
            drop(locks.acquire(id).await);
        }
        let _held = locks.acquire(100).await;
        assert_eq!(locks.tracked(), 1);
    }
}
