//! Periodic ingestion of every registered feed.
//!
//! On each tick the scheduler lists the registry and ingests every feed, a
//! bounded number at a time. A failing feed is logged and does not affect
//! the others or later ticks.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::ingest::{FeedRegistry, FeedSource, IngestError, Ingestor, ItemStore};

/// Summary of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Feeds attempted.
    pub feeds: usize,
    /// Feeds ingested without error.
    pub succeeded: usize,
    /// Feeds whose run failed.
    pub failed: usize,
    /// Items stored across all feeds.
    pub new_items: usize,
}

/// Periodic driver of the ingestion engine.
pub struct Scheduler<R, S, F> {
    ingestor: Arc<Ingestor<R, S, F>>,
    period: Duration,
    max_concurrent: usize,
}

impl<R, S, F> Scheduler<R, S, F>
where
    R: FeedRegistry + 'static,
    S: ItemStore + 'static,
    F: FeedSource + 'static,
{
    /// Create a scheduler from configuration.
    pub fn new(ingestor: Arc<Ingestor<R, S, F>>, config: &SchedulerConfig) -> Self {
        Self::with_interval(ingestor, config.interval(), config.max_concurrent_feeds)
    }

    /// Create a scheduler with an explicit period and concurrency.
    pub fn with_interval(
        ingestor: Arc<Ingestor<R, S, F>>,
        period: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            ingestor,
            period,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Ingest every registered feed once.
    pub async fn run_tick(&self) -> TickReport {
        let feeds = match self.ingestor.list_feeds().await {
            Ok(feeds) => feeds,
            Err(e) => {
                error!(error = %e, "Failed to list feeds");
                return TickReport::default();
            }
        };

        if feeds.is_empty() {
            debug!("No feeds registered");
            return TickReport::default();
        }

        info!(feeds = feeds.len(), "Ingesting registered feeds");

        let results: Vec<(i64, Result<usize, IngestError>)> = stream::iter(feeds)
            .map(|feed| {
                let ingestor = Arc::clone(&self.ingestor);
                async move {
                    let result = ingestor.ingest(feed.id).await.map(|o| o.new_count);
                    (feed.id, result)
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut report = TickReport {
            feeds: results.len(),
            ..Default::default()
        };
        for (feed_id, result) in results {
            match result {
                Ok(new_items) => {
                    report.succeeded += 1;
                    report.new_items += new_items;
                }
                Err(e) => {
                    warn!(feed_id, error = %e, "Feed ingestion failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            new_items = report.new_items,
            "Scheduled ingestion finished"
        );
        report
    }

    /// Run ticks on a background task until the handle is stopped.
    ///
    /// The first tick fires one period after start. Ticks missed while a
    /// slow tick is running are skipped, so ticks never overlap.
    pub fn start(self) -> SchedulerHandle {
        let (cancel_tx, mut cancel_rx) = broadcast::channel::<()>(1);

        let join = tokio::spawn(async move {
            info!(
                interval_secs = self.period.as_secs(),
                max_concurrent = self.max_concurrent,
                "Scheduler started"
            );

            let mut timer = interval_at(Instant::now() + self.period, self.period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel_rx.recv() => {
                        info!("Scheduler stopping");
                        break;
                    }
                    _ = timer.tick() => {
                        self.run_tick().await;
                    }
                }
            }
        });

        SchedulerHandle { cancel_tx, join }
    }
}

/// Handle to a running scheduler.
pub struct SchedulerHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the scheduler. A tick already in progress runs to completion.
    pub async fn stop(self) {
        let _ = self.cancel_tx.send(());
        if let Err(e) = self.join.await {
            warn!(error = %e, "Scheduler task panicked");
        }
    }
}
