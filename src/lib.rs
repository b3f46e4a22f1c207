//! Scrapper - scheduled RSS ingestion with subscriber digests
//!
//! Periodically fetches every registered feed, stores entries whose link has
//! not been seen for that feed, and sends followers a digest of what is new.

pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod notify;
pub mod rss;
pub mod scheduler;
pub mod web;

pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{Result, ScrapperError};
pub use ingest::{IngestError, IngestOutcome, Ingestor};
pub use notify::{start_fanout, FanoutHandle, FanoutQueue, OutboxNotifier};
pub use rss::{Feed, FeedItem, FetchError, NewFeed, RssFetcher};
pub use scheduler::{Scheduler, SchedulerHandle, TickReport};

/// Ingestion engine backed by SQLite and the HTTP fetcher.
pub type SqliteIngestor = Ingestor<Database, Database, RssFetcher>;
