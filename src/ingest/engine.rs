//! The ingestion run.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info};

use super::{DedupIndex, FeedLocks, FeedRegistry, FeedSource, ItemStore};
use crate::datetime::parse_pub_date;
use crate::notify::{FanoutJob, FanoutQueue};
use crate::rss::{Feed, FeedItem, FetchError};

/// Default upper bound for one registry or store call.
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default upper bound for fetching one document.
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that abort an ingestion run.
///
/// When a run fails nothing has been stored and nobody is notified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// The feed is not registered.
    #[error("feed {0} not found")]
    NotFound(i64),

    /// The document could not be fetched or read.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The registry or item store failed or timed out.
    #[error("store error: {0}")]
    Store(String),
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    /// The ingested feed.
    pub feed_id: i64,
    /// Number of items stored by this run.
    pub new_count: usize,
    /// The stored items, in document order.
    pub entries: Vec<FeedItem>,
    /// Entries skipped because their link was already known.
    pub skipped_known: usize,
    /// Entries skipped because their publication date did not parse.
    pub skipped_undated: usize,
}

/// Runs ingestion for one feed at a time per feed ID.
///
/// Shared by the scheduler and the on-demand trigger; runs for the same feed
/// are serialized, runs for different feeds are not.
pub struct Ingestor<R, S, F> {
    registry: R,
    store: S,
    source: F,
    fanout: Option<FanoutQueue>,
    locks: FeedLocks,
    store_timeout: Duration,
    fetch_timeout: Duration,
}

impl<R, S, F> Ingestor<R, S, F>
where
    R: FeedRegistry,
    S: ItemStore,
    F: FeedSource,
{
    /// Create an engine without notification.
    pub fn new(registry: R, store: S, source: F) -> Self {
        Self {
            registry,
            store,
            source,
            fanout: None,
            locks: FeedLocks::new(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Hand new items to this fan-out queue.
    pub fn with_fanout(mut self, queue: FanoutQueue) -> Self {
        self.fanout = Some(queue);
        self
    }

    /// Bound every registry and store call.
    pub fn with_store_timeout(mut self, limit: Duration) -> Self {
        self.store_timeout = limit;
        self
    }

    /// Bound every document fetch.
    pub fn with_fetch_timeout(mut self, limit: Duration) -> Self {
        self.fetch_timeout = limit;
        self
    }

    /// List every registered feed.
    pub async fn list_feeds(&self) -> Result<Vec<Feed>, IngestError> {
        self.store_call("list feeds", self.registry.list_feeds()).await
    }

    /// Ingest one feed.
    ///
    /// Fetches the document, drops entries whose link is already stored for
    /// the feed (or appeared earlier in the same document) and entries whose
    /// publication date does not parse, then stores the rest as one batch.
    /// If anything was stored, the items are queued for fan-out before this
    /// returns; delivery happens in the background.
    pub async fn ingest(&self, feed_id: i64) -> Result<IngestOutcome, IngestError> {
        let _guard = self.locks.acquire(feed_id).await;

        let feed = self
            .store_call("get feed", self.registry.get_feed(feed_id))
            .await?
            .ok_or(IngestError::NotFound(feed_id))?;

        let fetched = timeout(self.fetch_timeout, self.source.fetch_entries(&feed.url))
            .await
            .unwrap_or(Err(FetchError::Timeout))?;

        let stored = self
            .store_call("load stored links", self.store.find_links(feed.id))
            .await?;
        let mut index = DedupIndex::new(stored);

        let mut entries = Vec::new();
        let mut skipped_known = 0;
        let mut skipped_undated = 0;

        for entry in fetched {
            if index.contains(&entry.link) {
                skipped_known += 1;
                continue;
            }

            let published_at = match parse_pub_date(&entry.pub_date) {
                Ok(dt) => dt,
                Err(e) => {
                    debug!(feed_id, link = %entry.link, error = %e, "Skipping entry");
                    skipped_undated += 1;
                    continue;
                }
            };

            index.admit(&entry.link);
            entries.push(FeedItem::from_fetched(feed.id, entry, published_at));
        }

        if !entries.is_empty() {
            let stored = self
                .store_call("store items", self.store.insert_batch(&entries))
                .await?;
            if stored != entries.len() as u64 {
                return Err(IngestError::Store(format!(
                    "store items: stored {stored} of {} items",
                    entries.len()
                )));
            }

            if let Some(queue) = &self.fanout {
                queue.enqueue(FanoutJob {
                    feed: feed.clone(),
                    entries: entries.clone(),
                });
            }
        }

        info!(
            feed_id,
            feed = %feed.name,
            new = entries.len(),
            skipped_known,
            skipped_undated,
            "Ingested feed"
        );

        Ok(IngestOutcome {
            feed_id,
            new_count: entries.len(),
            entries,
            skipped_known,
            skipped_undated,
        })
    }

    async fn store_call<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = crate::Result<T>>,
    ) -> Result<T, IngestError> {
        match timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(|e| IngestError::Store(format!("{op}: {e}"))),
            Err(_) => Err(IngestError::Store(format!(
                "{op}: timed out after {:?}",
                self.store_timeout
            ))),
        }
    }
}
