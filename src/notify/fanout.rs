//! Background fan-out of digests to feed followers.
//!
//! Ingestion runs push a [`FanoutJob`] onto an unbounded queue and return
//! immediately. A single worker task drains the queue and delivers each job
//! to every follower, one subscriber at a time, with a timeout per send.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Notifier, SendError, SubscriberDirectory};
use crate::rss::{Feed, FeedItem};

/// New entries of one feed, waiting to be delivered.
#[derive(Debug, Clone)]
pub struct FanoutJob {
    /// The feed the entries belong to.
    pub feed: Feed,
    /// The entries stored by the run, in document order.
    pub entries: Vec<FeedItem>,
}

/// Producer side of the fan-out queue.
#[derive(Debug, Clone)]
pub struct FanoutQueue {
    tx: mpsc::UnboundedSender<FanoutJob>,
}

impl FanoutQueue {
    /// Create a queue and its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<FanoutJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a job without waiting. Returns `false` if no worker is listening.
    pub fn enqueue(&self, job: FanoutJob) -> bool {
        let feed_id = job.feed.id;
        match self.tx.send(job) {
            Ok(()) => true,
            Err(_) => {
                warn!(feed_id, "Fan-out worker is not running, digest dropped");
                false
            }
        }
    }
}

/// Outcome of delivering one job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Subscribers that received the digest.
    pub sent: usize,
    /// Subscribers whose delivery failed.
    pub failed: usize,
}

/// Delivers jobs through a directory and a notifier.
pub struct FanoutWorker<D, N> {
    directory: D,
    notifier: N,
    send_timeout: Duration,
}

impl<D, N> FanoutWorker<D, N>
where
    D: SubscriberDirectory + 'static,
    N: Notifier + 'static,
{
    /// Create a worker.
    pub fn new(directory: D, notifier: N, send_timeout: Duration) -> Self {
        Self {
            directory,
            notifier,
            send_timeout,
        }
    }

    /// Deliver one job to every follower of its feed.
    ///
    /// Each subscriber is attempted independently; a failure is logged and
    /// counted, never returned.
    pub async fn deliver(&self, job: &FanoutJob) -> DeliveryReport {
        let feed_id = job.feed.id;
        let mut report = DeliveryReport::default();

        let subscriptions = match tokio::time::timeout(
            self.send_timeout,
            self.directory.list_subscriptions(feed_id),
        )
        .await
        {
            Ok(Ok(subs)) => subs,
            Ok(Err(e)) => {
                warn!(feed_id, error = %e, "Failed to list feed followers");
                return report;
            }
            Err(_) => {
                warn!(feed_id, "Timed out listing feed followers");
                return report;
            }
        };

        if subscriptions.is_empty() {
            debug!(feed_id, "Feed has no followers");
            return report;
        }

        for sub in &subscriptions {
            match self.deliver_one(sub.user_id, job).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    warn!(feed_id, user_id = sub.user_id, error = %e, "Failed to deliver digest");
                    report.failed += 1;
                }
            }
        }

        info!(
            feed_id,
            entries = job.entries.len(),
            sent = report.sent,
            failed = report.failed,
            "Feed digest fan-out complete"
        );
        report
    }

    async fn deliver_one(&self, user_id: i64, job: &FanoutJob) -> Result<(), SendError> {
        let contact = tokio::time::timeout(self.send_timeout, self.directory.resolve_contact(user_id))
            .await
            .map_err(|_| SendError::Timeout)?
            .map_err(|e| SendError::Transport(e.to_string()))?
            .ok_or(SendError::Unresolvable(user_id))?;

        tokio::time::timeout(
            self.send_timeout,
            self.notifier.send(&contact, &job.feed, &job.entries),
        )
        .await
        .map_err(|_| SendError::Timeout)?
    }

    /// Run the worker on its own task.
    ///
    /// The task ends when every [`FanoutQueue`] is dropped or when the
    /// returned handle is stopped; queued jobs are delivered first.
    pub fn spawn(self, mut rx: mpsc::UnboundedReceiver<FanoutJob>) -> FanoutHandle {
        let (cancel_tx, mut cancel_rx) = broadcast::channel::<()>(1);

        let join = tokio::spawn(async move {
            info!("Fan-out worker started");
            loop {
                tokio::select! {
                    _ = cancel_rx.recv() => {
                        rx.close();
                        let mut drained = 0usize;
                        while let Some(job) = rx.recv().await {
                            self.deliver(&job).await;
                            drained += 1;
                        }
                        info!(drained, "Fan-out worker stopping");
                        break;
                    }
                    job = rx.recv() => match job {
                        Some(job) => {
                            self.deliver(&job).await;
                        }
                        None => {
                            info!("Fan-out queue closed, worker stopping");
                            break;
                        }
                    },
                }
            }
        });

        FanoutHandle { cancel_tx, join }
    }
}

/// Start a fan-out worker and return its queue and handle.
pub fn start_fanout<D, N>(directory: D, notifier: N, send_timeout: Duration) -> (FanoutQueue, FanoutHandle)
where
    D: SubscriberDirectory + 'static,
    N: Notifier + 'static,
{
    let (queue, rx) = FanoutQueue::channel();
    let handle = FanoutWorker::new(directory, notifier, send_timeout).spawn(rx);
    (queue, handle)
}

/// Handle to a running fan-out worker.
pub struct FanoutHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl FanoutHandle {
    /// Stop accepting jobs, deliver the ones already queued and wait for the
    /// worker to exit.
    pub async fn stop(self) {
        let _ = self.cancel_tx.send(());
        if let Err(e) = self.join.await {
            warn!(error = %e, "Fan-out worker panicked");
        }
    }
}
