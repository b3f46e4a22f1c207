//! Response DTOs for the trigger API.

use chrono::SecondsFormat;
use serde::Serialize;

use crate::ingest::IngestOutcome;
use crate::rss::FeedItem;

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Result of an on-demand scrape.
#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    /// Scraped feed ID.
    pub feed_id: i64,
    /// Number of items stored by this scrape.
    pub new_items: usize,
    /// The stored items.
    pub items: Vec<FeedItemResponse>,
}

impl From<IngestOutcome> for ScrapeResponse {
    fn from(outcome: IngestOutcome) -> Self {
        Self {
            feed_id: outcome.feed_id,
            new_items: outcome.new_count,
            items: outcome.entries.into_iter().map(Into::into).collect(),
        }
    }
}

/// A stored feed item.
#[derive(Debug, Serialize)]
pub struct FeedItemResponse {
    /// Item ID.
    pub id: String,
    /// Title.
    pub title: String,
    /// Link.
    pub link: String,
    /// Description.
    pub description: String,
    /// Publication time (RFC 3339, UTC).
    pub published_at: String,
}

impl From<FeedItem> for FeedItemResponse {
    fn from(item: FeedItem) -> Self {
        Self {
            id: item.id,
            title: item.title,
            link: item.link,
            description: item.description,
            published_at: item.published_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}
