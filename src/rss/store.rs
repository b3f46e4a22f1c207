//! SQLite-backed collaborators for ingestion and notification.
//!
//! [`Database`] acts as the feed registry, the item store and the subscriber
//! directory; each call borrows the pool through the matching repository.

use std::collections::HashSet;

use crate::db::UserRepository;
use crate::ingest::{FeedRegistry, ItemStore};
use crate::notify::{Contact, SubscriberDirectory};
use crate::rss::repository::{FeedItemRepository, FeedRepository, SubscriptionRepository};
use crate::rss::types::{Feed, FeedItem, Subscription};
use crate::{Database, Result};

impl FeedRegistry for Database {
    async fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        FeedRepository::new(self.pool()).get_by_id(id).await
    }

    async fn list_feeds(&self) -> Result<Vec<Feed>> {
        FeedRepository::new(self.pool()).list_all().await
    }
}

impl ItemStore for Database {
    async fn find_links(&self, feed_id: i64) -> Result<HashSet<String>> {
        FeedItemRepository::new(self.pool()).find_links(feed_id).await
    }

    async fn insert_batch(&self, items: &[FeedItem]) -> Result<u64> {
        FeedItemRepository::new(self.pool()).insert_batch(items).await
    }
}

impl SubscriberDirectory for Database {
    async fn list_subscriptions(&self, feed_id: i64) -> Result<Vec<Subscription>> {
        SubscriptionRepository::new(self.pool())
            .list_by_feed(feed_id)
            .await
    }

    async fn resolve_contact(&self, user_id: i64) -> Result<Option<Contact>> {
        let user = UserRepository::new(self.pool()).get_by_id(user_id).await?;

        Ok(user.and_then(|user| {
            let address = user.email.filter(|e| !e.trim().is_empty())?;
            Some(Contact {
                user_id: user.id,
                name: user.username,
                address,
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewUser;
    use crate::rss::types::NewFeed;

    #[tokio::test]
    async fn test_registry_lookup() {
        let db = Database::open_in_memory().await.unwrap();
        let owner = UserRepository::new(db.pool())
            .create(&NewUser::new("owner"))
            .await
            .unwrap();
        let feed = FeedRepository::new(db.pool())
            .create(&NewFeed::new("https://example.com/feed", "Example", owner.id))
            .await
            .unwrap();

        assert_eq!(db.get_feed(feed.id).await.unwrap(), Some(feed.clone()));
        assert_eq!(db.get_feed(feed.id + 1).await.unwrap(), None);
        assert_eq!(db.list_feeds().await.unwrap(), vec![feed]);
    }

    #[tokio::test]
    async fn test_resolve_contact() {
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());
        let with_email = users
            .create(&NewUser::new("ama").with_email("ama@example.com"))
            .await
            .unwrap();
        let without_email = users.create(&NewUser::new("kofi")).await.unwrap();
        let blank_email = users
            .create(&NewUser::new("yaw").with_email("  "))
            .await
            .unwrap();

        let contact = db.resolve_contact(with_email.id).await.unwrap().unwrap();
        assert_eq!(contact.address, "ama@example.com");
        assert_eq!(contact.name, "ama");

        assert!(db.resolve_contact(without_email.id).await.unwrap().is_none());
        assert!(db.resolve_contact(blank_email.id).await.unwrap().is_none());
        assert!(db.resolve_contact(9999).await.unwrap().is_none());
    }
}
