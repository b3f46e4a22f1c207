//! Ingestion pipeline tests.
//!
//! Fetch over HTTP, dedupe against SQLite, store, and fan digests out to the
//! mail outbox.

mod common;

use wiremock::MockServer;

use common::{rss_document, serve_document, serve_status, three_items, Fixture, Item};
use scrapper::notify::MailOutboxRepository;
use scrapper::rss::FeedItemRepository;
use scrapper::{FetchError, IngestError};

#[tokio::test]
async fn test_first_run_stores_and_notifies_followers() {
    let server = MockServer::start().await;
    serve_document(&server, rss_document(&three_items())).await;

    let fixture = Fixture::new().await;
    let feed_id = fixture.add_mock_feed("Tech News", &server).await;
    let (ingestor, fanout) = fixture.ingestor();

    let outcome = ingestor.ingest(feed_id).await.unwrap();
    assert_eq!(outcome.new_count, 3);
    assert_eq!(outcome.entries[0].description, "About First");

    fanout.stop().await;

    // kofi has no email address and is skipped
    assert_eq!(
        fixture.outbox_recipients().await,
        vec!["ama@example.com", "esi@example.com"]
    );

    let messages = MailOutboxRepository::new(fixture.db.pool())
        .list_pending(10)
        .await
        .unwrap();
    assert_eq!(messages[0].subject, "New Items in Your Followed Feed: Tech News");
    assert_eq!(messages[0].sender, "Scrapper Team <digest@example.com>");
    assert!(messages[0].body_text.starts_with("Hello ama,"));
    assert!(messages[0].body_text.contains("We found 3 new item(s)"));
    assert!(messages[0].body_text.contains("Published: Jan 02, 2006"));
}

#[tokio::test]
async fn test_rerun_stores_nothing_and_sends_nothing() {
    let server = MockServer::start().await;
    serve_document(&server, rss_document(&three_items())).await;

    let fixture = Fixture::new().await;
    let feed_id = fixture.add_mock_feed("Tech News", &server).await;
    let (ingestor, fanout) = fixture.ingestor();

    assert_eq!(ingestor.ingest(feed_id).await.unwrap().new_count, 3);
    let second = ingestor.ingest(feed_id).await.unwrap();
    assert_eq!(second.new_count, 0);
    assert_eq!(second.skipped_known, 3);

    fanout.stop().await;

    let items = FeedItemRepository::new(fixture.db.pool());
    assert_eq!(items.count_by_feed(feed_id).await.unwrap(), 3);
    assert_eq!(fixture.outbox_recipients().await.len(), 2);
}

#[tokio::test]
async fn test_only_new_entries_are_stored_and_sent() {
    let server = MockServer::start().await;
    let fixture = Fixture::new().await;
    let feed_id = fixture.add_mock_feed("Tech News", &server).await;
    let (ingestor, fanout) = fixture.ingestor();

    serve_document(&server, rss_document(&three_items()[..1])).await;
    assert_eq!(ingestor.ingest(feed_id).await.unwrap().new_count, 1);

    serve_document(&server, rss_document(&three_items())).await;
    let outcome = ingestor.ingest(feed_id).await.unwrap();
    assert_eq!(outcome.new_count, 2);
    assert_eq!(
        outcome
            .entries
            .iter()
            .map(|e| e.link.as_str())
            .collect::<Vec<_>>(),
        vec!["https://example.com/2", "https://example.com/3"]
    );

    fanout.stop().await;

    let messages = MailOutboxRepository::new(fixture.db.pool())
        .list_pending(10)
        .await
        .unwrap();
    assert_eq!(messages.len(), 4);
    assert!(messages[2].body_text.contains("We found 2 new item(s)"));
    assert!(!messages[2].body_text.contains("https://example.com/1\n"));
}

#[tokio::test]
async fn test_entries_with_bad_dates_are_skipped() {
    let server = MockServer::start().await;
    let items = vec![
        Item::new("First", "https://example.com/1"),
        Item::new("Second", "https://example.com/2").with_date("the other day"),
        Item::new("Third", "https://example.com/3").with_date("2024-01-15T10:30:00Z"),
    ];
    serve_document(&server, rss_document(&items)).await;

    let fixture = Fixture::new().await;
    let feed_id = fixture.add_mock_feed("Tech News", &server).await;
    let (ingestor, fanout) = fixture.ingestor();

    let outcome = ingestor.ingest(feed_id).await.unwrap();
    fanout.stop().await;

    assert_eq!(outcome.new_count, 2);
    assert_eq!(outcome.skipped_undated, 1);
    let links = FeedItemRepository::new(fixture.db.pool())
        .find_links(feed_id)
        .await
        .unwrap();
    assert!(!links.contains("https://example.com/2"));
}

#[tokio::test]
async fn test_empty_document_sends_nothing() {
    let server = MockServer::start().await;
    serve_document(&server, rss_document(&[])).await;

    let fixture = Fixture::new().await;
    let feed_id = fixture.add_mock_feed("Quiet Feed", &server).await;
    let (ingestor, fanout) = fixture.ingestor();

    assert_eq!(ingestor.ingest(feed_id).await.unwrap().new_count, 0);
    fanout.stop().await;
    assert!(fixture.outbox_recipients().await.is_empty());
}

#[tokio::test]
async fn test_failing_source_stores_nothing() {
    let server = MockServer::start().await;
    serve_status(&server, 500).await;

    let fixture = Fixture::new().await;
    let feed_id = fixture.add_mock_feed("Broken Feed", &server).await;
    let (ingestor, fanout) = fixture.ingestor();

    let result = ingestor.ingest(feed_id).await;
    assert_eq!(result, Err(IngestError::Fetch(FetchError::Status(500))));

    fanout.stop().await;
    let items = FeedItemRepository::new(fixture.db.pool());
    assert_eq!(items.count_by_feed(feed_id).await.unwrap(), 0);
    assert!(fixture.outbox_recipients().await.is_empty());
}

#[tokio::test]
async fn test_unknown_feed() {
    let fixture = Fixture::new().await;
    let (ingestor, fanout) = fixture.ingestor();

    assert_eq!(ingestor.ingest(999).await, Err(IngestError::NotFound(999)));
    fanout.stop().await;
}

#[tokio::test]
async fn test_links_are_scoped_per_feed() {
    let server = MockServer::start().await;
    serve_document(&server, rss_document(&three_items())).await;

    let fixture = Fixture::new().await;
    let first = fixture.add_mock_feed("Mirror A", &server).await;
    let second = fixture.add_mock_feed("Mirror B", &server).await;
    let (ingestor, fanout) = fixture.ingestor();

    assert_eq!(ingestor.ingest(first).await.unwrap().new_count, 3);
    assert_eq!(ingestor.ingest(second).await.unwrap().new_count, 3);
    fanout.stop().await;

    assert_eq!(fixture.outbox_recipients().await.len(), 4);
}

#[tokio::test]
async fn test_podcast_feed_keeps_every_dated_episode() {
    let server = MockServer::start().await;
    let document = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"><channel>
<title>Podcast</title>
<item><title>Episode One</title><itunes:title>Ep. 1</itunes:title>
<link>https://example.com/ep1</link><pubDate>2024-01-15 10:30:00</pubDate></item>
<item><title>Episode Two</title>
<link>https://example.com/ep2</link><pubDate>2024-01-15 10:30:00</pubDate></item>
</channel></rss>"#;
    serve_document(&server, document.to_string()).await;

    let fixture = Fixture::new().await;
    let feed_id = fixture.add_mock_feed("Podcast", &server).await;
    let (ingestor, fanout) = fixture.ingestor();

    let outcome = ingestor.ingest(feed_id).await.unwrap();
    fanout.stop().await;

    assert_eq!(outcome.new_count, 2);
    assert_eq!(outcome.skipped_undated, 0);
    assert_eq!(outcome.entries[0].title, "Episode One");
}
