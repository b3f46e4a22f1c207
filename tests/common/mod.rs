//! Test helpers for integration tests.
//!
//! Builds an in-memory database with users, a feed pointing at a wiremock
//! server, and an ingestion engine wired the way `main` wires it.

#![allow(dead_code)]

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scrapper::config::{FetchConfig, NotifyConfig};
use scrapper::db::{NewUser, UserRepository};
use scrapper::notify::MailOutboxRepository;
use scrapper::rss::{FeedRepository, SubscriptionRepository};
use scrapper::{
    start_fanout, Database, FanoutHandle, Ingestor, NewFeed, OutboxNotifier, RssFetcher,
    SqliteIngestor,
};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Path the mock server serves the feed document on.
pub const FEED_PATH: &str = "/feed.xml";

/// Publication date every generated item uses unless overridden.
pub const PUB_DATE: &str = "Mon, 02 Jan 2006 15:04:05 -0700";

/// One `<item>` of a generated RSS document.
pub struct Item<'a> {
    pub title: &'a str,
    pub link: &'a str,
    pub pub_date: &'a str,
}

impl<'a> Item<'a> {
    pub fn new(title: &'a str, link: &'a str) -> Self {
        Self {
            title,
            link,
            pub_date: PUB_DATE,
        }
    }

    pub fn with_date(mut self, pub_date: &'a str) -> Self {
        self.pub_date = pub_date;
        self
    }
}

/// Render an RSS 2.0 document.
pub fn rss_document(items: &[Item<'_>]) -> String {
    let body: String = items
        .iter()
        .map(|item| {
            format!(
                "<item><title>{}</title><link>{}</link>\
                 <description>&lt;p&gt;About {}&lt;/p&gt;</description>\
                 <pubDate>{}</pubDate></item>",
                item.title, item.link, item.title, item.pub_date
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Test Feed</title><link>https://example.com</link>{body}</channel></rss>"#
    )
}

/// Three dated items with distinct links.
pub fn three_items() -> Vec<Item<'static>> {
    vec![
        Item::new("First", "https://example.com/1"),
        Item::new("Second", "https://example.com/2"),
        Item::new("Third", "https://example.com/3"),
    ]
}

/// Serve `document` at [`FEED_PATH`], replacing any earlier mock.
pub async fn serve_document(server: &MockServer, document: String) {
    server.reset().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(document),
        )
        .mount(server)
        .await;
}

/// Serve `document` after `delay`.
pub async fn serve_document_slowly(server: &MockServer, document: String, delay: Duration) {
    server.reset().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(document)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Answer every request with `status`.
pub async fn serve_status(server: &MockServer, status: u16) {
    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Database with an owner, two followers with email and one without.
pub struct Fixture {
    pub db: Database,
    pub owner_id: i64,
    pub follower_ids: Vec<i64>,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());

        let owner_id = users
            .create(&NewUser::new("owner").with_email("owner@example.com"))
            .await
            .unwrap()
            .id;
        let mut follower_ids = Vec::new();
        for (name, email) in [("ama", Some("ama@example.com")), ("kofi", None), ("esi", Some("esi@example.com"))] {
            let mut user = NewUser::new(name);
            if let Some(email) = email {
                user = user.with_email(email);
            }
            follower_ids.push(users.create(&user).await.unwrap().id);
        }

        Self {
            db,
            owner_id,
            follower_ids,
        }
    }

    /// Register a feed at `url` followed by every follower.
    pub async fn add_feed(&self, name: &str, url: &str) -> i64 {
        let feed = FeedRepository::new(self.db.pool())
            .create(&NewFeed::new(url, name, self.owner_id))
            .await
            .unwrap();

        let subs = SubscriptionRepository::new(self.db.pool());
        for user_id in &self.follower_ids {
            subs.follow(feed.id, *user_id).await.unwrap();
        }
        feed.id
    }

    /// Register a feed served by `server`.
    pub async fn add_mock_feed(&self, name: &str, server: &MockServer) -> i64 {
        self.add_feed(name, &format!("{}{}", server.uri(), FEED_PATH))
            .await
    }

    /// Build the engine and its fan-out worker.
    pub fn ingestor(&self) -> (SqliteIngestor, FanoutHandle) {
        let notify_config = NotifyConfig {
            sender_address: "digest@example.com".to_string(),
            ..Default::default()
        };
        let notifier = OutboxNotifier::new(self.db.clone(), &notify_config);
        let (queue, handle) = start_fanout(self.db.clone(), notifier, DEFAULT_TIMEOUT);

        let ingestor = Ingestor::new(self.db.clone(), self.db.clone(), fetcher())
            .with_store_timeout(DEFAULT_TIMEOUT)
            .with_fetch_timeout(DEFAULT_TIMEOUT)
            .with_fanout(queue);
        (ingestor, handle)
    }

    /// Recipients of queued digests, oldest first.
    pub async fn outbox_recipients(&self) -> Vec<String> {
        MailOutboxRepository::new(self.db.pool())
            .list_pending(100)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.recipient)
            .collect()
    }
}

/// Fetcher that may reach the loopback mock server.
pub fn fetcher() -> RssFetcher {
    RssFetcher::new(&FetchConfig {
        allow_private_hosts: true,
        ..Default::default()
    })
    .unwrap()
}
