// crates/core/src/graphql/mutation.rs
//! Single `startJob` attempt over HTTP with failure classification.

use reqwest::header::CONTENT_TYPE;
use serde_json::json;

use super::{GraphqlResponse, StartJobData, START_JOB_MUTATION};
use crate::error::BridgeError;
use crate::types::{JobHandle, JobRequest};

pub struct MutationClient {
    http: reqwest::Client,
    endpoint: String,
}

impl MutationClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    /// One POST of the start mutation.
    ///
    /// Classification:
    /// - connection failure, HTTP 5xx, undecodable body → `Transport`
    /// - other non-success status, GraphQL `errors`, missing `startJob` → `Application`
    pub async fn start_job(&self, request: &JobRequest) -> Result<JobHandle, BridgeError> {
        let mut builder = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        let body = json!({
            "query": START_JOB_MUTATION,
            "variables": { "input": request.input },
        });

        let response = builder
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                // a request that cannot be built (bad header) will never succeed
                if e.is_builder() {
                    BridgeError::application(format!("invalid start request: {e}"))
                } else {
                    BridgeError::transport(format!("start request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BridgeError::from_status(status.as_u16(), &text));
        }

        let payload: GraphqlResponse<StartJobData> = response
            .json()
            .await
            .map_err(|e| BridgeError::transport(format!("invalid start response: {e}")))?;

        if let Some(message) = payload.error_message() {
            return Err(BridgeError::application(message));
        }

        let job = payload
            .data
            .and_then(|d| d.start_job)
            .ok_or_else(|| BridgeError::application("start response carried no startJob"))?;
        tracing::info!(job_id = %job.id, "job started");
        Ok(job)
    }
}
