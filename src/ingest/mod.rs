//! Ingestion engine for scrapper.
//!
//! One ingestion run fetches a feed's document, keeps the entries whose link
//! has not been stored yet and whose publication date parses, persists them
//! as one batch and hands them to the notification fan-out.
//!
//! The engine talks to its collaborators through the traits below so the
//! SQLite store and HTTP fetcher can be swapped for in-memory fakes.

mod dedup;
mod engine;
mod lock;

pub use dedup::DedupIndex;
pub use engine::{IngestError, IngestOutcome, Ingestor};
pub use lock::{FeedLockGuard, FeedLocks};

use std::collections::HashSet;
use std::future::Future;

use crate::rss::{Feed, FeedItem, FetchError, FetchedEntry};
use crate::Result;

/// Lookup of registered feeds.
pub trait FeedRegistry: Send + Sync {
    /// Get a feed by ID, `None` if it is not registered.
    fn get_feed(&self, id: i64) -> impl Future<Output = Result<Option<Feed>>> + Send;

    /// List every registered feed.
    fn list_feeds(&self) -> impl Future<Output = Result<Vec<Feed>>> + Send;
}

/// Durable storage of ingested items.
pub trait ItemStore: Send + Sync {
    /// Links already stored for a feed.
    fn find_links(&self, feed_id: i64) -> impl Future<Output = Result<HashSet<String>>> + Send;

    /// Store a batch atomically: all items or none. Returns how many were stored.
    fn insert_batch(&self, items: &[FeedItem]) -> impl Future<Output = Result<u64>> + Send;
}

/// Source of feed documents.
pub trait FeedSource: Send + Sync {
    /// Fetch the entries of the document at `url`, in document order.
    fn fetch_entries(
        &self,
        url: &str,
    ) -> impl Future<Output = std::result::Result<Vec<FetchedEntry>, FetchError>> + Send;
}
