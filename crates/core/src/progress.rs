// crates/core/src/progress.rs
//! Progress delivery toward the caller.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::types::{ProgressEvent, ProgressNotification, ProgressToken};

/// Where progress notifications go. Implemented by the transport layer.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn send_progress(&self, notification: ProgressNotification) -> Result<(), NotifyError>;
}

/// Per-call notification path shared by subscription updates and heartbeats.
///
/// Delivery is best-effort: [`Notifier::notify`] awaits the send so ordering
/// is preserved, then drops any [`NotifyError`] after logging it. A lost
/// notification never changes the outcome of a job.
pub struct Notifier {
    sink: Arc<dyn ProgressSink>,
    token: Option<ProgressToken>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn ProgressSink>, token: Option<ProgressToken>) -> Self {
        Self { sink, token }
    }

    /// Send one notification and report the outcome.
    ///
    /// `Ok(false)` means the call carried no progress token, so nothing was sent.
    pub async fn deliver(&self, event: ProgressEvent) -> Result<bool, NotifyError> {
        let Some(token) = self.token.clone() else {
            return Ok(false);
        };
        self.sink
            .send_progress(ProgressNotification::new(token, event))
            .await?;
        Ok(true)
    }

    /// Fire-and-forget wrapper over [`Notifier::deliver`]; the result is discarded.
    pub async fn notify(&self, event: ProgressEvent) {
        if let Err(e) = self.deliver(event).await {
            tracing::debug!(error = %e, "progress notification dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<ProgressNotification>>);

    #[async_trait]
    impl ProgressSink for Recording {
        async fn send_progress(&self, n: ProgressNotification) -> Result<(), NotifyError> {
            self.0.lock().unwrap().push(n);
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl ProgressSink for Broken {
        async fn send_progress(&self, _n: ProgressNotification) -> Result<(), NotifyError> {
            Err(NotifyError::new("transport closed"))
        }
    }

    #[tokio::test]
    async fn test_deliver_without_token_is_noop() {
        let sink = Arc::new(Recording::default());
        let notifier = Notifier::new(sink.clone(), None);
        assert!(!notifier.deliver(ProgressEvent::heartbeat()).await.unwrap());
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deliver_attaches_token() {
        let sink = Arc::new(Recording::default());
        let notifier = Notifier::new(sink.clone(), Some(ProgressToken::new(7)));
        assert!(notifier.deliver(ProgressEvent::new(40.0, "x")).await.unwrap());
        let sent = sink.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].progress_token, ProgressToken::new(7));
        assert_eq!(sent[0].progress, 40.0);
    }

    #[tokio::test]
    async fn test_notify_swallows_errors() {
        let notifier = Notifier::new(Arc::new(Broken), Some(ProgressToken::new("t")));
        assert!(notifier.deliver(ProgressEvent::heartbeat()).await.is_err());
        // must not panic or propagate
        notifier.notify(ProgressEvent::heartbeat()).await;
    }
}
