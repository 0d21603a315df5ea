// crates/core/src/backend.rs
//! JobBackend trait: the two backend operations the bridge needs.

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::headers::HeaderSet;
use crate::subscription::JobSubscription;
use crate::types::{JobHandle, JobRequest};

/// A backend that can start jobs and stream their updates.
///
/// Implementations:
/// - `GraphqlBackend` — HTTP mutation + `graphql-transport-ws` subscription
/// - in-process fakes in tests
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// One start attempt. Errors must be classified (see
    /// [`BridgeError::is_retryable`]); retrying is the caller's job.
    async fn start_job(&self, request: &JobRequest) -> Result<JobHandle, BridgeError>;

    /// Open the update channel for `job`. Never retried.
    async fn subscribe(
        &self,
        job: &JobHandle,
        headers: &HeaderSet,
    ) -> Result<JobSubscription, BridgeError>;
}
