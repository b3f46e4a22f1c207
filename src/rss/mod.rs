//! Feed module for scrapper.
//!
//! This module holds the feed registry, the stored items and followers, and
//! the HTTP fetcher that reads syndication documents.

pub mod fetcher;
pub mod repository;
pub mod store;
pub mod types;

pub use fetcher::{strip_html, validate_url, FetchError, RssFetcher};
pub use repository::{FeedItemRepository, FeedRepository, SubscriptionRepository};
pub use types::{Feed, FeedItem, FetchedEntry, NewFeed, Subscription};
