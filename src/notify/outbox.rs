//! Outbox-backed notifier.
//!
//! Digests are rendered and written to the `mail_outbox` table; a mail relay
//! outside this process picks up unsent rows and marks them sent.

use chrono::{DateTime, Utc};
use tracing::info;

use super::{Contact, Digest, Notifier, SendError};
use crate::config::NotifyConfig;
use crate::datetime::parse_db_datetime;
use crate::db::DbPool;
use crate::rss::{Feed, FeedItem};
use crate::{Database, Result};

/// A queued outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxMessage {
    /// Message ID.
    pub id: i64,
    /// `From` header value.
    pub sender: String,
    /// Recipient address.
    pub recipient: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body_text: String,
    /// HTML body.
    pub body_html: String,
    /// Feed the digest is about, if it still exists.
    pub feed_id: Option<i64>,
    /// When the message was queued.
    pub created_at: DateTime<Utc>,
    /// When the relay delivered it.
    pub sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct OutboxRow {
    id: i64,
    sender: String,
    recipient: String,
    subject: String,
    body_text: String,
    body_html: String,
    feed_id: Option<i64>,
    created_at: String,
    sent_at: Option<String>,
}

impl From<OutboxRow> for OutboxMessage {
    fn from(row: OutboxRow) -> Self {
        OutboxMessage {
            id: row.id,
            sender: row.sender,
            recipient: row.recipient,
            subject: row.subject,
            body_text: row.body_text,
            body_html: row.body_html,
            feed_id: row.feed_id,
            created_at: parse_db_datetime(&row.created_at).unwrap_or_else(Utc::now),
            sent_at: row.sent_at.and_then(|s| parse_db_datetime(&s)),
        }
    }
}

/// Repository for the mail outbox.
pub struct MailOutboxRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> MailOutboxRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Queue a rendered digest.
    pub async fn enqueue(
        &self,
        sender: &str,
        recipient: &str,
        feed_id: i64,
        digest: &Digest,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO mail_outbox (sender, recipient, subject, body_text, body_html, feed_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(sender)
        .bind(recipient)
        .bind(&digest.subject)
        .bind(&digest.text)
        .bind(&digest.html)
        .bind(feed_id)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Messages not yet delivered, oldest first.
    pub async fn list_pending(&self, limit: usize) -> Result<Vec<OutboxMessage>> {
        let rows = sqlx::query_as::<_, OutboxRow>(
            r#"
            SELECT id, sender, recipient, subject, body_text, body_html, feed_id, created_at, sent_at
            FROM mail_outbox
            WHERE sent_at IS NULL
            ORDER BY id
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(OutboxMessage::from).collect())
    }

    /// Mark a message delivered.
    pub async fn mark_sent(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE mail_outbox SET sent_at = datetime('now') WHERE id = $1 AND sent_at IS NULL",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Notifier that renders digests into the mail outbox.
#[derive(Clone)]
pub struct OutboxNotifier {
    db: Database,
    sender: String,
    timezone: String,
}

impl OutboxNotifier {
    /// Create a notifier writing to `db`.
    pub fn new(db: Database, config: &NotifyConfig) -> Self {
        Self {
            db,
            sender: format!("{} <{}>", config.sender_name, config.sender_address),
            timezone: config.timezone.clone(),
        }
    }

    /// The `From` header value used for queued messages.
    pub fn sender(&self) -> &str {
        &self.sender
    }
}

impl Notifier for OutboxNotifier {
    async fn send(
        &self,
        to: &Contact,
        feed: &Feed,
        entries: &[FeedItem],
    ) -> std::result::Result<(), SendError> {
        let digest = Digest::render(&to.name, &feed.name, entries, &self.timezone, Utc::now());

        let id = MailOutboxRepository::new(self.db.pool())
            .enqueue(&self.sender, &to.address, feed.id, &digest)
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        info!(
            message_id = id,
            feed_id = feed.id,
            recipient = %to.address,
            entries = entries.len(),
            "Queued feed digest"
        );
        Ok(())
    }
}
