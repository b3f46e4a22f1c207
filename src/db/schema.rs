//! Database schema and migrations for scrapper.
//!
//! Migrations are applied in order when the database is opened. The
//! `schema_version` table records which ones have already run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: Users (subscribers and feed owners)
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE,
    email       TEXT,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v2: Feeds registry
    r#"
CREATE TABLE feeds (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    url         TEXT NOT NULL,
    name        TEXT NOT NULL,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_feeds_user_id ON feeds(user_id);
"#,
    // v3: Ingested feed items, unique per (feed, link)
    r#"
CREATE TABLE feed_items (
    id            TEXT PRIMARY KEY,
    feed_id       INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
    title         TEXT NOT NULL,
    link          TEXT NOT NULL,
    description   TEXT NOT NULL DEFAULT '',
    published_at  TEXT NOT NULL,
    created_at    TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(feed_id, link)
);

CREATE INDEX idx_feed_items_feed_id ON feed_items(feed_id);
"#,
    // v4: Feed followers
    r#"
CREATE TABLE feed_followers (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    feed_id     INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(feed_id, user_id)
);

CREATE INDEX idx_feed_followers_feed_id ON feed_followers(feed_id);
"#,
    // v5: Outgoing digest mail, picked up by the mail relay
    r#"
CREATE TABLE mail_outbox (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    sender      TEXT NOT NULL,
    recipient   TEXT NOT NULL,
    subject     TEXT NOT NULL,
    body_text   TEXT NOT NULL,
    body_html   TEXT NOT NULL,
    feed_id     INTEGER REFERENCES feeds(id) ON DELETE SET NULL,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    sent_at     TEXT
);

CREATE INDEX idx_mail_outbox_unsent ON mail_outbox(sent_at);
"#,
];
