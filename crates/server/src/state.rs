// crates/server/src/state.rs
//! Shared state for the MCP surface.

use std::sync::Arc;

use mcp_facade_core::{BridgeConfig, CallRegistry, GraphqlBackend, JobBackend, JobBridge};
use tokio_util::sync::CancellationToken;

/// Everything the HTTP and stdio transports share.
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<JobBridge>,
    /// Cancelled on shutdown; MCP sessions run on child tokens.
    pub shutdown_token: CancellationToken,
}

impl AppState {
    /// State backed by the GraphQL backend described by `config`.
    pub fn new(config: BridgeConfig) -> Self {
        let backend = Arc::new(GraphqlBackend::new(&config));
        Self::with_backend(backend, config)
    }

    pub fn with_backend(backend: Arc<dyn JobBackend>, config: BridgeConfig) -> Self {
        Self {
            bridge: Arc::new(JobBridge::new(backend, config, CallRegistry::new())),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> &Arc<CallRegistry> {
        self.bridge.registry()
    }

    /// Cancel every in-flight call and stop accepting sessions.
    pub fn shutdown(&self) -> usize {
        let cancelled = self.registry().cancel_all();
        self.shutdown_token.cancel();
        cancelled
    }
}
