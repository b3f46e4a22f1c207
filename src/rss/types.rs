//! RSS types for scrapper.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A registered feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    /// Feed ID.
    pub id: i64,
    /// Source URL of the syndication document.
    pub url: String,
    /// Display name.
    pub name: String,
    /// Owning user ID.
    pub user_id: i64,
    /// When the feed was created.
    pub created_at: DateTime<Utc>,
    /// When the feed name or URL was last edited.
    pub updated_at: DateTime<Utc>,
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Source URL.
    pub url: String,
    /// Display name.
    pub name: String,
    /// Owning user ID.
    pub user_id: i64,
}

impl NewFeed {
    /// Create a new feed.
    pub fn new(url: impl Into<String>, name: impl Into<String>, user_id: i64) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            user_id,
        }
    }
}

/// A persisted feed item.
///
/// Items are created by the ingestion engine and never modified afterwards.
/// Within one feed the link is unique.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    /// Item ID (UUID v4, minted before the item is stored).
    pub id: String,
    /// Feed ID this item belongs to.
    pub feed_id: i64,
    /// Item title.
    pub title: String,
    /// Canonical link, the deduplication key.
    pub link: String,
    /// Item description (HTML stripped).
    pub description: String,
    /// When the item was published.
    pub published_at: DateTime<Utc>,
}

impl FeedItem {
    /// Build an item from a fetched entry with a freshly minted ID.
    pub fn from_fetched(feed_id: i64, entry: FetchedEntry, published_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            feed_id,
            title: entry.title,
            link: entry.link,
            description: entry.description,
            published_at,
        }
    }
}

/// An entry as read from the source document, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedEntry {
    /// Entry title.
    pub title: String,
    /// Entry link.
    pub link: String,
    /// Entry description.
    pub description: String,
    /// Publication date exactly as written in the document.
    pub pub_date: String,
}

impl FetchedEntry {
    /// Create a fetched entry.
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        description: impl Into<String>,
        pub_date: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            description: description.into(),
            pub_date: pub_date.into(),
        }
    }
}

/// A user following a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    /// Subscription ID.
    pub id: i64,
    /// Followed feed ID.
    pub feed_id: i64,
    /// Following user ID.
    pub user_id: i64,
    /// When the user started following.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_feed() {
        let feed = NewFeed::new("https://example.com/feed.xml", "Example", 7);
        assert_eq!(feed.url, "https://example.com/feed.xml");
        assert_eq!(feed.name, "Example");
        assert_eq!(feed.user_id, 7);
    }

    #[test]
    fn test_feed_item_from_fetched() {
        let now = Utc::now();
        let entry = FetchedEntry::new("Title", "https://example.com/1", "Body", "raw");
        let item = FeedItem::from_fetched(3, entry, now);

        assert_eq!(item.feed_id, 3);
        assert_eq!(item.title, "Title");
        assert_eq!(item.link, "https://example.com/1");
        assert_eq!(item.description, "Body");
        assert_eq!(item.published_at, now);
        assert!(Uuid::parse_str(&item.id).is_ok());
    }

    #[test]
    fn test_feed_item_ids_are_unique() {
        let now = Utc::now();
        let entry = FetchedEntry::new("T", "https://example.com/1", "", "");
        let a = FeedItem::from_fetched(1, entry.clone(), now);
        let b = FeedItem::from_fetched(1, entry, now);
        assert_ne!(a.id, b.id);
    }
}
