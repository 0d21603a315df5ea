// crates/server/src/main.rs
//! mcp-facade binary.
//!
//! Logs go to stderr so stdout stays free for the stdio transport.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use mcp_facade_server::cli::Cli;
use mcp_facade_server::{app, AppState, FacadeServer};
use rmcp::ServiceExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // reqwest and tokio-tungstenite both pull rustls in; pick one provider
    // before either builds a TLS config.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,mcp_facade_server=info,mcp_facade_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(config) = cli.bridge_config() else {
        Cli::command().print_help()?;
        std::process::exit(1);
    };
    info!(backend = %config.backend_url, channel = %config.channel_url, "bridging backend");

    let state = AppState::new(config);
    if cli.stdio {
        serve_stdio(state).await
    } else {
        serve_http(state, &cli.listen_addr()).await
    }
}

async fn serve_stdio(state: AppState) -> Result<()> {
    info!("serving MCP on stdio");
    let service = FacadeServer::new(state.bridge.clone())
        .serve((tokio::io::stdin(), tokio::io::stdout()))
        .await
        .context("stdio handshake failed")?;

    tokio::select! {
        quit = service.waiting() => {
            quit.context("stdio service failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            let cancelled = state.shutdown();
            info!(cancelled, "interrupted, shutting down");
        }
    }
    Ok(())
}

async fn serve_http(state: AppState, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!("MCP server listening at http://{addr}{}", mcp_facade_server::MCP_PATH);

    let router = app(state.clone());
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            let cancelled = state.shutdown();
            info!(cancelled, "interrupted, closing sessions");
        })
        .await
        .context("http server failed")
}
