// crates/server/src/lib.rs
//! MCP facade server: the `long_running_task` tool over Streamable HTTP or
//! stdio, backed by the job bridge.

pub mod cli;
pub mod error;
pub mod state;
pub mod tool;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use tower_http::trace::TraceLayer;

pub use state::AppState;
pub use tool::FacadeServer;

/// MCP endpoint path.
pub const MCP_PATH: &str = "/mcp";

/// SSE keepalive on open Streamable HTTP streams.
const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

pub fn app(state: AppState) -> Router {
    let server = FacadeServer::new(Arc::clone(&state.bridge));
    let mcp: StreamableHttpService<FacadeServer, LocalSessionManager> = StreamableHttpService::new(
        move || Ok(server.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            stateful_mode: true,
            sse_keep_alive: Some(SSE_KEEP_ALIVE),
            cancellation_token: state.shutdown_token.child_token(),
            ..Default::default()
        },
    );

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest_service(MCP_PATH, mcp)
        .layer(TraceLayer::new_for_http())
}
