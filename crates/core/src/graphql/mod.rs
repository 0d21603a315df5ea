// crates/core/src/graphql/mod.rs
//! GraphQL backend: `startJob` over HTTP, `jobUpdates` over
//! `graphql-transport-ws`.

pub mod channel;
pub mod mutation;

use async_trait::async_trait;
use serde::Deserialize;

use crate::backend::JobBackend;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::headers::HeaderSet;
use crate::subscription::JobSubscription;
use crate::types::{JobHandle, JobRequest, JobUpdate};

pub use channel::SubscriptionClient;
pub use mutation::MutationClient;

pub const START_JOB_MUTATION: &str = "mutation StartJob($input: String!) {
  startJob(input: $input) {
    id
  }
}";

pub const JOB_UPDATES_SUBSCRIPTION: &str = "subscription JobUpdates($id: ID!) {
  jobUpdates(id: $id) {
    id
    status
    progress
    message
    result
  }
}";

/// Standard GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphqlError>>,
}

impl<T> GraphqlResponse<T> {
    /// `errors` joined with `; `, if there are any.
    pub fn error_message(&self) -> Option<String> {
        let errors = self.errors.as_ref().filter(|e| !e.is_empty())?;
        Some(join_errors(errors))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlError {
    pub message: String,
}

pub fn join_errors(errors: &[GraphqlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartJobData {
    pub start_job: Option<JobHandle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdatesData {
    pub job_updates: Option<JobUpdate>,
}

/// [`JobBackend`] talking to a GraphQL server.
pub struct GraphqlBackend {
    mutation: MutationClient,
    channel: SubscriptionClient,
}

impl GraphqlBackend {
    pub fn new(config: &BridgeConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: &BridgeConfig, http: reqwest::Client) -> Self {
        Self {
            mutation: MutationClient::new(http, config.backend_url.clone()),
            channel: SubscriptionClient::new(config.channel_url.clone()),
        }
    }
}

#[async_trait]
impl JobBackend for GraphqlBackend {
    async fn start_job(&self, request: &JobRequest) -> Result<JobHandle, BridgeError> {
        self.mutation.start_job(request).await
    }

    async fn subscribe(
        &self,
        job: &JobHandle,
        headers: &HeaderSet,
    ) -> Result<JobSubscription, BridgeError> {
        self.channel.open(job, headers).await
    }
}
