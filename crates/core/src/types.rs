// crates/core/src/types.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::headers::HeaderSet;

/// `total` sent with every progress notification.
pub const DEFAULT_TOTAL: f64 = 100.0;

/// Message carried by keepalive notifications.
pub const HEARTBEAT_MESSAGE: &str = "heartbeat";

/// Input to the start mutation, built once per tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub input: String,
    pub headers: HeaderSet,
}

/// Backend job identity returned by the start mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: String,
}

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Job lifecycle as reported on the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[serde(alias = "queued")]
    Pending,
    Running,
    Complete,
    Error,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }
}

/// One `jobUpdates` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    #[serde(default)]
    pub id: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn new(status: JobStatus) -> Self {
        Self {
            id: None,
            status,
            progress: None,
            message: None,
            result: None,
            error: None,
        }
    }

    pub fn running(progress: f64, message: impl Into<String>) -> Self {
        Self {
            progress: Some(progress),
            message: Some(message.into()),
            ..Self::new(JobStatus::Running)
        }
    }

    pub fn complete(result: impl Into<String>) -> Self {
        Self {
            result: Some(result.into()),
            ..Self::new(JobStatus::Complete)
        }
    }

    /// Progress notification this update produces. Missing fields become
    /// zero progress and an empty message.
    pub fn progress_event(&self) -> ProgressEvent {
        ProgressEvent::new(
            self.progress.unwrap_or(0.0),
            self.message.clone().unwrap_or_default(),
        )
    }

    /// Best description of why a job ended in `error`.
    pub fn failure_message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "job reported an error".to_string())
    }
}

/// A progress report headed for the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub progress: f64,
    pub message: String,
    pub total: f64,
}

impl ProgressEvent {
    pub fn new(progress: f64, message: impl Into<String>) -> Self {
        Self {
            progress,
            message: message.into(),
            total: DEFAULT_TOTAL,
        }
    }

    pub fn heartbeat() -> Self {
        Self::new(0.0, HEARTBEAT_MESSAGE)
    }

    pub fn is_heartbeat(&self) -> bool {
        self.progress == 0.0 && self.message == HEARTBEAT_MESSAGE
    }
}

/// Opaque token correlating notifications with the originating call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressToken(pub Value);

impl ProgressToken {
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Wire shape of `notifications/progress` params.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressNotification {
    pub progress_token: ProgressToken,
    pub progress: f64,
    pub total: f64,
    pub message: String,
}

impl ProgressNotification {
    pub fn new(progress_token: ProgressToken, event: ProgressEvent) -> Self {
        Self {
            progress_token,
            progress: event.progress,
            total: event.total,
            message: event.message,
        }
    }
}

/// One tool invocation as handed over by the transport layer.
#[derive(Debug, Clone, Default)]
pub struct ToolCall {
    pub input: String,
    pub progress_token: Option<ProgressToken>,
    /// Raw `Authorization` header of the request that carried the call.
    pub caller_authorization: Option<String>,
    pub session_id: Option<String>,
    pub cancel: Option<CancellationToken>,
}

impl ToolCall {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_progress_token(mut self, token: ProgressToken) -> Self {
        self.progress_token = Some(token);
        self
    }

    pub fn with_authorization(mut self, authorization: impl Into<String>) -> Self {
        self.caller_authorization = Some(authorization.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_update_deserialize() {
        let json = r#"{"id":"J1","status":"running","progress":40,"message":"step 2 of 5","result":null}"#;
        let update: JobUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.id.as_deref(), Some("J1"));
        assert_eq!(update.status, JobStatus::Running);
        assert_eq!(update.progress, Some(40.0));
        assert!(update.result.is_none());
    }

    #[test]
    fn test_job_status_aliases_and_unknown() {
        let status: JobStatus = serde_json::from_str(r#""queued""#).unwrap();
        assert_eq!(status, JobStatus::Pending);
        let status: JobStatus = serde_json::from_str(r#""paused""#).unwrap();
        assert_eq!(status, JobStatus::Unknown);
        assert!(JobStatus::Complete.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_progress_event_defaults() {
        let event = JobUpdate::new(JobStatus::Complete).progress_event();
        assert_eq!(event.progress, 0.0);
        assert_eq!(event.message, "");
        assert_eq!(event.total, 100.0);
        assert!(ProgressEvent::heartbeat().is_heartbeat());
    }

    #[test]
    fn test_progress_notification_wire_shape() {
        let n = ProgressNotification::new(
            ProgressToken::new("tok-1"),
            ProgressEvent::new(40.0, "step 2 of 5"),
        );
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "progressToken": "tok-1",
                "progress": 40.0,
                "total": 100.0,
                "message": "step 2 of 5"
            })
        );
    }
}
