// crates/core/src/config.rs
//! Bridge configuration.

use std::time::Duration;

use crate::headers::HeaderSet;

/// Retry budget for the start mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (5 → 6 attempts total).
    pub retries: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Everything the bridge needs to reach one backend.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// GraphQL HTTP endpoint, e.g. `http://localhost:5000/graphql`.
    pub backend_url: String,
    /// Realtime endpoint derived from `backend_url`.
    pub channel_url: String,
    pub static_headers: HeaderSet,
    pub retry: RetryPolicy,
    pub heartbeat_interval: Duration,
}

impl BridgeConfig {
    pub fn new(backend_url: impl Into<String>) -> Self {
        let backend_url = backend_url.into();
        Self {
            channel_url: channel_url_for(&backend_url),
            backend_url,
            static_headers: HeaderSet::new(),
            retry: RetryPolicy::default(),
            heartbeat_interval: Duration::from_millis(5000),
        }
    }

    pub fn with_headers(mut self, headers: HeaderSet) -> Self {
        self.static_headers = headers;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

/// Map the backend URL onto its websocket equivalent.
///
/// `https://` becomes `wss://`, `http://` becomes `ws://` (scheme matched
/// without regard to case); the rest of the URL is kept byte for byte.
/// Anything else is returned unchanged.
pub fn channel_url_for(backend_url: &str) -> String {
    if let Some(rest) = strip_scheme(backend_url, "https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = strip_scheme(backend_url, "http://") {
        format!("ws://{rest}")
    } else {
        backend_url.to_string()
    }
}

fn strip_scheme<'a>(url: &'a str, scheme: &str) -> Option<&'a str> {
    let head = url.get(..scheme.len())?;
    head.eq_ignore_ascii_case(scheme)
        .then(|| &url[scheme.len()..])
}
