// crates/core/src/retry.rs
//! Retrying mutation invoker.

use std::future::Future;

use crate::backend::JobBackend;
use crate::config::RetryPolicy;
use crate::error::BridgeError;
use crate::types::{JobHandle, JobRequest};

/// Run `attempt` until it succeeds, fails with a non-retryable error, or the
/// retry budget is spent.
///
/// A non-retryable error returns at once without touching the budget. Once
/// `policy.retries` retries have failed, the last retryable error is returned.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Result<T, BridgeError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, BridgeError>>,
{
    let mut attempt_no = 0u32;
    loop {
        attempt_no += 1;
        match attempt(attempt_no).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) if attempt_no > policy.retries => {
                tracing::warn!(attempts = attempt_no, error = %e, "retry budget exhausted");
                return Err(e);
            }
            Err(e) => {
                tracing::info!(
                    attempt = attempt_no,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %e,
                    "start request failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

/// Start a job on `backend` under `policy`.
pub async fn start_with_retry<B>(
    backend: &B,
    policy: &RetryPolicy,
    request: &JobRequest,
) -> Result<JobHandle, BridgeError>
where
    B: JobBackend + ?Sized,
{
    with_retry(policy, move |_| backend.start_job(request)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&policy(), |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n <= 5 {
                    Err(BridgeError::transport("connection refused"))
                } else {
                    Ok("J1")
                }
            }
        })
        .await;
        assert_eq!(result, Ok("J1"));
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_waits_five_delays() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();
        let result: Result<(), _> = with_retry(&policy(), |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(BridgeError::from_status(503, &format!("attempt {n}"))) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        // the last error wins
        match result {
            Err(BridgeError::Transport { message, .. }) => assert!(message.contains("attempt 6")),
            other => panic!("expected transport failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();
        let result: Result<(), _> = with_retry(&policy(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(BridgeError::application("input must not be empty")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(matches!(result, Err(BridgeError::Application { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_after_transient_keeps_its_class() {
        let result: Result<(), _> = with_retry(&policy(), |n| async move {
            if n == 1 {
                Err(BridgeError::transport("reset"))
            } else {
                Err(BridgeError::from_status(403, "Forbidden"))
            }
        })
        .await;
        assert!(matches!(result, Err(BridgeError::Application { status: Some(403), .. })));
    }
}
