// crates/core/src/error.rs
use thiserror::Error;

/// Terminal failure of one bridged tool call.
///
/// Only `Transport` is retryable, and only while starting the job. Everything
/// else ends the call as soon as it is observed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Connection-level failure or HTTP 5xx from the start request.
    #[error("transport failure: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// Backend-reported error content, HTTP 4xx, or a job that ended in error.
    #[error("application failure: {message}")]
    Application {
        status: Option<u16>,
        message: String,
    },

    /// The realtime channel failed or closed before a terminal update.
    #[error("subscription failure: {message}")]
    Subscription { message: String },

    /// The caller cancelled the request.
    #[error("Request cancelled")]
    Cancelled,
}

impl BridgeError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            status: None,
            message: message.into(),
        }
    }

    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription {
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP status from the start request.
    ///
    /// 5xx is a server fault and may be retried; anything else (4xx, stray 3xx)
    /// is the caller's problem and is surfaced as-is.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = format!("Backend error {status}: {body}");
        if status >= 500 {
            Self::Transport {
                status: Some(status),
                message,
            }
        } else {
            Self::Application {
                status: Some(status),
                message,
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Short machine-readable label, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Application { .. } => "application",
            Self::Subscription { .. } => "subscription",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A progress notification could not be delivered to the caller.
///
/// Never fails a call: the bridge logs it and moves on.
#[derive(Debug, Error)]
#[error("progress delivery failed: {0}")]
pub struct NotifyError(pub String);

impl NotifyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = BridgeError::from_status(503, "unavailable");
        assert!(err.is_retryable());
        assert!(matches!(err, BridgeError::Transport { status: Some(503), .. }));

        let err = BridgeError::from_status(500, "");
        assert!(err.is_retryable());

        let err = BridgeError::from_status(401, "Unauthorized");
        assert!(!err.is_retryable());
        assert!(matches!(err, BridgeError::Application { status: Some(401), .. }));
        assert!(err.to_string().contains("Backend error 401: Unauthorized"));
    }

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(BridgeError::transport("connection refused").is_retryable());
        assert!(!BridgeError::application("bad input").is_retryable());
        assert!(!BridgeError::subscription("socket closed").is_retryable());
        assert!(!BridgeError::Cancelled.is_retryable());
    }

    #[test]
    fn test_cancelled_display_is_distinct() {
        assert_eq!(BridgeError::Cancelled.to_string(), "Request cancelled");
        assert_eq!(BridgeError::Cancelled.kind(), "cancelled");
        assert_eq!(BridgeError::subscription("x").kind(), "subscription");
    }
}
