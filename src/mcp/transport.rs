//! Stdio transport for direct invocation by a host assistant.

use std::sync::Arc;

use rmcp::service::ServiceExt;
use rmcp::transport::io::stdio;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::handler::{AppState, RelayServer};
use crate::{AppError, Result};

/// Serve the MCP server over stdio until the client disconnects or the
/// cancellation token fires.
///
/// # Errors
///
/// Returns `AppError::Mcp` if the transport fails to initialize.
pub async fn serve_stdio(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let server = RelayServer::new(state);

    info!("starting stdio MCP transport");
    let service = server
        .serve_with_ct(stdio(), ct)
        .await
        .map_err(|err| AppError::Mcp(format!("stdio transport failed: {err}")))?;

    service
        .waiting()
        .await
        .map_err(|err| AppError::Mcp(format!("stdio service error: {err}")))?;

    info!("stdio MCP transport shut down");
    Ok(())
}
