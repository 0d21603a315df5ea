// crates/core/src/subscription.rs
//! Subscription handle handed from a backend to the bridge.
//!
//! A `JobSubscription` is the read end of one job's update channel. The
//! backend side (a socket pump, or a [`SubscriptionFeed`] in-process) pushes
//! items in arrival order; the bridge pulls them with
//! [`JobSubscription::next_update`]. Not restartable: a new call needs a new
//! subscription.

use tokio::sync::{mpsc, oneshot};

use crate::error::BridgeError;
use crate::types::JobUpdate;

/// One item on the update channel. A closed channel (`None` from
/// `next_update`) means the backend completed the stream.
pub type ChannelItem = Result<JobUpdate, BridgeError>;

pub struct JobSubscription {
    updates: mpsc::Receiver<ChannelItem>,
    close: Option<oneshot::Sender<()>>,
}

impl JobSubscription {
    /// Wrap a backend's item receiver. `close` fires once on dispose so the
    /// producer can tear its side down.
    pub fn new(updates: mpsc::Receiver<ChannelItem>, close: oneshot::Sender<()>) -> Self {
        Self {
            updates,
            close: Some(close),
        }
    }

    /// In-process pair: the feed pushes, the subscription reads.
    pub fn channel(buffer: usize) -> (SubscriptionFeed, JobSubscription) {
        let (tx, rx) = mpsc::channel(buffer);
        let (close_tx, close_rx) = oneshot::channel();
        (
            SubscriptionFeed {
                updates: tx,
                closed: close_rx,
            },
            JobSubscription::new(rx, close_tx),
        )
    }

    /// Next item in arrival order. `None` once the producer finished or the
    /// subscription was disposed.
    pub async fn next_update(&mut self) -> Option<ChannelItem> {
        if self.is_disposed() {
            return None;
        }
        self.updates.recv().await
    }

    /// Stop the subscription. Returns `false` if it was already disposed.
    ///
    /// Anything still queued is discarded.
    pub fn dispose(&mut self) -> bool {
        let Some(close) = self.close.take() else {
            return false;
        };
        let _ = close.send(());
        self.updates.close();
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.close.is_none()
    }
}

impl Drop for JobSubscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Producer side of [`JobSubscription::channel`].
pub struct SubscriptionFeed {
    updates: mpsc::Sender<ChannelItem>,
    closed: oneshot::Receiver<()>,
}

impl SubscriptionFeed {
    /// Push one item. Returns `false` once the subscription is gone.
    pub async fn send(&self, item: ChannelItem) -> bool {
        self.updates.send(item).await.is_ok()
    }

    pub async fn update(&self, update: JobUpdate) -> bool {
        self.send(Ok(update)).await
    }

    /// Resolves when the subscription is disposed or dropped.
    pub async fn disposed(&mut self) {
        if self.is_disposed() {
            return;
        }
        let _ = (&mut self.closed).await;
    }

    pub fn is_disposed(&mut self) -> bool {
        !matches!(
            self.closed.try_recv(),
            Err(oneshot::error::TryRecvError::Empty)
        )
    }

    /// End the stream without a terminal update.
    pub fn finish(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobStatus;

    #[tokio::test]
    async fn test_updates_arrive_in_order() {
        let (feed, mut sub) = JobSubscription::channel(8);
        feed.update(JobUpdate::running(20.0, "a")).await;
        feed.update(JobUpdate::running(40.0, "b")).await;
        feed.update(JobUpdate::complete("done")).await;
        feed.finish();

        let mut seen = Vec::new();
        while let Some(item) = sub.next_update().await {
            seen.push(item.unwrap().status);
        }
        assert_eq!(seen, vec![JobStatus::Running, JobStatus::Running, JobStatus::Complete]);
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent_and_stops_delivery() {
        let (mut feed, mut sub) = JobSubscription::channel(8);
        feed.update(JobUpdate::running(20.0, "queued before dispose")).await;

        assert!(sub.dispose());
        assert!(!sub.dispose());
        assert!(sub.is_disposed());
        assert!(sub.next_update().await.is_none());

        feed.disposed().await;
        assert!(feed.is_disposed());
        assert!(!feed.update(JobUpdate::running(60.0, "late")).await);
    }

    #[tokio::test]
    async fn test_drop_signals_producer() {
        let (mut feed, sub) = JobSubscription::channel(1);
        assert!(!feed.is_disposed());
        drop(sub);
        feed.disposed().await;
        assert!(feed.is_disposed());
    }
}
