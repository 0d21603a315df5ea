// crates/core/src/bridge.rs
//! The job bridge: one tool call in, one backend job out.
//!
//! ```text
//! ToolCall ─► merge headers ─► register ─► start_with_retry ─► subscribe
//!                                                                │
//!            ┌───────────────── select! (biased) ◄──────────────┘
//!            │  1. cancellation fired      → Err(Cancelled)
//!            │  2. next subscription item  → notify, maybe resolve
//!            │  3. heartbeat tick          → notify "heartbeat"
//!            └─► cleanup (heartbeat, subscription, watcher), exactly once
//! ```
//!
//! Everything for one call lives in a [`CallContext`] driven by the task that
//! awaits [`JobBridge::call`]. Dropping that future runs the same cleanup.

use std::sync::Arc;

use crate::backend::JobBackend;
use crate::cancel::CancellationWatcher;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::headers::merge_headers;
use crate::heartbeat::Heartbeat;
use crate::progress::{Notifier, ProgressSink};
use crate::registry::{CallRegistry, DEFAULT_SESSION};
use crate::retry::start_with_retry;
use crate::subscription::JobSubscription;
use crate::types::{JobHandle, JobRequest, JobStatus, ProgressEvent, ToolCall};

pub struct JobBridge {
    backend: Arc<dyn JobBackend>,
    config: BridgeConfig,
    registry: Arc<CallRegistry>,
}

impl JobBridge {
    pub fn new(
        backend: Arc<dyn JobBackend>,
        config: BridgeConfig,
        registry: Arc<CallRegistry>,
    ) -> Self {
        Self {
            backend,
            config,
            registry,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CallRegistry> {
        &self.registry
    }

    /// Run one tool call to completion and return the job's result text.
    ///
    /// Progress goes to `sink` only when the call carries a progress token.
    pub async fn call(
        &self,
        call: ToolCall,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<String, BridgeError> {
        let ToolCall {
            input,
            progress_token,
            caller_authorization,
            session_id,
            cancel,
        } = call;

        let watcher = CancellationWatcher::attach(cancel.as_ref());
        let registration = self.registry.register(
            session_id.as_deref().unwrap_or(DEFAULT_SESSION),
            watcher.token().unwrap_or_default(),
        );
        let call_id = registration.call_id();

        let mut ctx = CallContext::new(Notifier::new(sink, progress_token), watcher);
        let request = JobRequest {
            input,
            headers: merge_headers(&self.config.static_headers, caller_authorization.as_deref()),
        };

        let job = self.start(&ctx, request.clone()).await;
        let outcome = match job {
            Ok(job) => {
                registration.set_job(&job.id);
                self.follow(&mut ctx, &job, &request).await
            }
            Err(e) => Err(e),
        };
        ctx.cleanup();

        match &outcome {
            Ok(_) => tracing::info!(call_id, "call completed"),
            Err(BridgeError::Cancelled) => tracing::info!(call_id, "call cancelled"),
            Err(e) => tracing::warn!(call_id, kind = e.kind(), error = %e, "call failed"),
        }
        outcome
    }

    /// Start the job with retry. The start runs on its own task so a
    /// cancellation rejects the call at once while the request itself is left
    /// to finish; its result is then discarded.
    async fn start(&self, ctx: &CallContext, request: JobRequest) -> Result<JobHandle, BridgeError> {
        let backend = Arc::clone(&self.backend);
        let policy = self.config.retry;
        let start =
            tokio::spawn(async move { start_with_retry(backend.as_ref(), &policy, &request).await });

        tokio::select! {
            biased;
            _ = ctx.watcher.fired() => {
                tracing::info!("cancelled while starting job, start result will be discarded");
                Err(BridgeError::Cancelled)
            }
            joined = start => match joined {
                Ok(started) => started,
                Err(e) => Err(BridgeError::application(format!("start task failed: {e}"))),
            },
        }
    }

    async fn follow(
        &self,
        ctx: &mut CallContext,
        job: &JobHandle,
        request: &JobRequest,
    ) -> Result<String, BridgeError> {
        if ctx.watcher.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }
        ctx.heartbeat = Heartbeat::start(self.config.heartbeat_interval);

        let opening = self.backend.subscribe(job, &request.headers);
        tokio::pin!(opening);
        let subscription = loop {
            tokio::select! {
                biased;
                _ = ctx.watcher.fired() => return Err(BridgeError::Cancelled),
                opened = &mut opening => break opened?,
                _ = ctx.heartbeat.tick() => ctx.notifier.notify(ProgressEvent::heartbeat()).await,
            }
        };
        tracing::debug!(job_id = %job.id, "following job updates");
        ctx.subscription = Some(subscription);
        ctx.drive().await
    }
}

/// Resources held by one in-flight call.
struct CallContext {
    notifier: Notifier,
    heartbeat: Heartbeat,
    subscription: Option<JobSubscription>,
    watcher: CancellationWatcher,
    cleaned: bool,
}

impl CallContext {
    fn new(notifier: Notifier, watcher: CancellationWatcher) -> Self {
        Self {
            notifier,
            heartbeat: Heartbeat::idle(),
            subscription: None,
            watcher,
            cleaned: false,
        }
    }

    /// Pump the subscription until a terminal update, a channel failure, or
    /// cancellation. Cancellation wins ties.
    async fn drive(&mut self) -> Result<String, BridgeError> {
        let Some(subscription) = self.subscription.as_mut() else {
            return Err(BridgeError::subscription("no open subscription"));
        };
        loop {
            tokio::select! {
                biased;
                _ = self.watcher.fired() => return Err(BridgeError::Cancelled),
                item = subscription.next_update() => match item {
                    Some(Ok(update)) => {
                        self.notifier.notify(update.progress_event()).await;
                        match update.status {
                            JobStatus::Complete => return Ok(update.result.unwrap_or_default()),
                            JobStatus::Error => {
                                return Err(BridgeError::application(update.failure_message()))
                            }
                            _ => {}
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        return Err(BridgeError::subscription(
                            "update channel closed before the job finished",
                        ))
                    }
                },
                _ = self.heartbeat.tick() => {
                    self.notifier.notify(ProgressEvent::heartbeat()).await;
                }
            }
        }
    }

    /// Stop the heartbeat, dispose the subscription, detach the watcher.
    /// Returns `false` when cleanup already ran.
    fn cleanup(&mut self) -> bool {
        if self.cleaned {
            return false;
        }
        self.cleaned = true;
        self.heartbeat.cancel();
        if let Some(mut subscription) = self.subscription.take() {
            subscription.dispose();
        }
        self.watcher.detach();
        true
    }
}

impl Drop for CallContext {
    fn drop(&mut self) {
        if self.cleanup() {
            tracing::debug!("call dropped before completion, resources released");
        }
    }
}
