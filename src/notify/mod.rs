//! Subscriber notification for scrapper.
//!
//! After a run stores new items, the feed and its new entries are queued for
//! the fan-out worker, which sends one digest to every follower of the feed.
//! Delivery failures are logged per subscriber and never reach the run that
//! produced the items.

mod digest;
mod fanout;
mod outbox;

pub use digest::Digest;
pub use fanout::{
    start_fanout, DeliveryReport, FanoutHandle, FanoutJob, FanoutQueue, FanoutWorker,
};
pub use outbox::{MailOutboxRepository, OutboxMessage, OutboxNotifier};

use std::future::Future;

use thiserror::Error;

use crate::rss::{Feed, FeedItem, Subscription};
use crate::Result;

/// A subscriber's resolved delivery address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// User ID.
    pub user_id: i64,
    /// Name used in the greeting.
    pub name: String,
    /// Delivery address.
    pub address: String,
}

/// Errors raised while delivering a digest to one subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The subscriber has no usable address.
    #[error("no contact address for user {0}")]
    Unresolvable(i64),

    /// The delivery channel rejected the digest.
    #[error("transport error: {0}")]
    Transport(String),

    /// Delivery did not finish in time.
    #[error("send timed out")]
    Timeout,
}

/// Lookup of feed followers and their addresses.
pub trait SubscriberDirectory: Send + Sync {
    /// Followers of a feed.
    fn list_subscriptions(
        &self,
        feed_id: i64,
    ) -> impl Future<Output = Result<Vec<Subscription>>> + Send;

    /// Resolve a user's address, `None` if the user has none.
    fn resolve_contact(&self, user_id: i64) -> impl Future<Output = Result<Option<Contact>>> + Send;
}

/// Delivery channel for digests.
pub trait Notifier: Send + Sync {
    /// Deliver one digest of `entries` from `feed` to `to`.
    fn send(
        &self,
        to: &Contact,
        feed: &Feed,
        entries: &[FeedItem],
    ) -> impl Future<Output = std::result::Result<(), SendError>> + Send;
}
