//! Feed repositories for scrapper.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};

use super::types::{Feed, FeedItem, NewFeed, Subscription};
use crate::datetime::parse_db_datetime;
use crate::db::DbPool;
use crate::{Result, ScrapperError};

/// Render a timestamp for storage. UTC with a `Z` suffix keeps text order
/// equal to time order.
fn to_db_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: i64,
    url: String,
    name: String,
    user_id: i64,
    created_at: String,
    updated_at: String,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            url: row.url,
            name: row.name,
            user_id: row.user_id,
            created_at: parse_db_datetime(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_db_datetime(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedItemRow {
    id: String,
    feed_id: i64,
    title: String,
    link: String,
    description: String,
    published_at: String,
}

impl From<FeedItemRow> for FeedItem {
    fn from(row: FeedItemRow) -> Self {
        FeedItem {
            id: row.id,
            feed_id: row.feed_id,
            title: row.title,
            link: row.link,
            description: row.description,
            published_at: parse_db_datetime(&row.published_at).unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct SubscriptionRow {
    id: i64,
    feed_id: i64,
    user_id: i64,
    created_at: String,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription {
            id: row.id,
            feed_id: row.feed_id,
            user_id: row.user_id,
            created_at: parse_db_datetime(&row.created_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Repository for feed registry operations.
pub struct FeedRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Register a new feed.
    pub async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        if feed.url.trim().is_empty() {
            return Err(ScrapperError::Validation("feed url is empty".to_string()));
        }

        let id: i64 =
            sqlx::query_scalar("INSERT INTO feeds (url, name, user_id) VALUES ($1, $2, $3) RETURNING id")
                .bind(&feed.url)
                .bind(&feed.name)
                .bind(feed.user_id)
                .fetch_one(self.pool)
                .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| ScrapperError::NotFound("feed".to_string()))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Feed>> {
        let row = sqlx::query_as::<_, FeedRow>(
            "SELECT id, url, name, user_id, created_at, updated_at FROM feeds WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Feed::from))
    }

    /// List every registered feed, oldest first.
    pub async fn list_all(&self) -> Result<Vec<Feed>> {
        let rows = sqlx::query_as::<_, FeedRow>(
            "SELECT id, url, name, user_id, created_at, updated_at FROM feeds ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Feed::from).collect())
    }

    /// Rename a feed or point it at a new URL.
    pub async fn update(&self, id: i64, name: &str, url: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE feeds SET name = $1, url = $2, updated_at = datetime('now') WHERE id = $3",
        )
        .bind(name)
        .bind(url)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a feed together with its items and followers.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feeds WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Repository for stored feed items.
pub struct FeedItemRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedItemRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// All links already stored for a feed.
    pub async fn find_links(&self, feed_id: i64) -> Result<HashSet<String>> {
        let links: Vec<String> = sqlx::query_scalar("SELECT link FROM feed_items WHERE feed_id = $1")
            .bind(feed_id)
            .fetch_all(self.pool)
            .await?;

        Ok(links.into_iter().collect())
    }

    /// Insert items in a single transaction.
    ///
    /// Either every item is stored or none is. A link that already exists for
    /// the feed fails the whole batch. Returns the number of rows inserted.
    pub async fn insert_batch(&self, items: &[FeedItem]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for item in items {
            inserted += sqlx::query(
                r#"
                INSERT INTO feed_items (id, feed_id, title, link, description, published_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&item.id)
            .bind(item.feed_id)
            .bind(&item.title)
            .bind(&item.link)
            .bind(&item.description)
            .bind(to_db_datetime(&item.published_at))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// List items for a feed, newest first.
    pub async fn list_by_feed(&self, feed_id: i64, limit: usize) -> Result<Vec<FeedItem>> {
        let rows = sqlx::query_as::<_, FeedItemRow>(
            r#"
            SELECT id, feed_id, title, link, description, published_at
            FROM feed_items
            WHERE feed_id = $1
            ORDER BY published_at DESC, created_at DESC
            LIMIT $2
            "#,
        )
        .bind(feed_id)
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(FeedItem::from).collect())
    }

    /// Count items for a feed.
    pub async fn count_by_feed(&self, feed_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feed_items WHERE feed_id = $1")
            .bind(feed_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}

/// Repository for feed followers.
pub struct SubscriptionRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> SubscriptionRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Make a user follow a feed.
    pub async fn follow(&self, feed_id: i64, user_id: i64) -> Result<Subscription> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            INSERT INTO feed_followers (feed_id, user_id) VALUES ($1, $2)
            RETURNING id, feed_id, user_id, created_at
            "#,
        )
        .bind(feed_id)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Stop following a feed.
    pub async fn unfollow(&self, feed_id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feed_followers WHERE feed_id = $1 AND user_id = $2")
            .bind(feed_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Followers of a feed, in the order they subscribed.
    pub async fn list_by_feed(&self, feed_id: i64) -> Result<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, feed_id, user_id, created_at
            FROM feed_followers
            WHERE feed_id = $1
            ORDER BY id
            "#,
        )
        .bind(feed_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }
}
