//! Streamable HTTP transport.
//!
//! Mounts an rmcp [`StreamableHttpService`] under `/{endpoint}` on an axum
//! router, next to a plain `GET /health` probe.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::handler::{AppState, RelayServer};
use crate::{AppError, Result};

/// Handler for `GET /health`.
async fn health() -> &'static str {
    "ok"
}

/// Build the HTTP router: MCP under `/{endpoint}` plus `/health`.
#[must_use]
pub fn router(state: Arc<AppState>, endpoint: &str) -> Router {
    let service = StreamableHttpService::new(
        move || Ok(RelayServer::new(Arc::clone(&state))),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );
    let path = format!("/{}", endpoint.trim_matches('/'));

    Router::new()
        .nest_service(&path, service)
        .route("/health", get(health))
}

/// Serve the streamable HTTP transport on `127.0.0.1:port` until the
/// cancellation token fires.
///
/// # Errors
///
/// Returns `AppError::Mcp` if the listener cannot bind or the server fails.
pub async fn serve_http(
    state: Arc<AppState>,
    port: u16,
    endpoint: &str,
    ct: CancellationToken,
) -> Result<()> {
    let bind = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Mcp(format!("failed to bind HTTP on {bind}: {err}")))?;
    serve_on(listener, state, endpoint, ct).await
}

/// Serve on an already bound listener.
///
/// # Errors
///
/// Returns `AppError::Mcp` if the server fails.
pub async fn serve_on(
    listener: tokio::net::TcpListener,
    state: Arc<AppState>,
    endpoint: &str,
    ct: CancellationToken,
) -> Result<()> {
    let local = listener
        .local_addr()
        .map_err(|err| AppError::Mcp(format!("listener address unavailable: {err}")))?;
    info!(%local, endpoint, "starting streamable HTTP MCP transport");

    axum::serve(listener, router(state, endpoint))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Mcp(format!("HTTP server error: {err}")))?;

    info!("streamable HTTP MCP transport shut down");
    Ok(())
}
