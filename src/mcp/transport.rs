//! Stdio transport for direct invocation by agent hosts.
//!
//! One implicit session per process; the HTTP session manager is not used.

use std::sync::Arc;

use rmcp::service::ServiceExt;
use rmcp::transport::io::stdio;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::handler::{AppState, ZoningServer};
use crate::{AppError, Result};

/// Serve the lookup tools over stdio until the client disconnects or the
/// cancellation token fires.
///
/// # Errors
///
/// Returns `AppError::Io` if the transport fails to initialize or the
/// service terminates abnormally.
pub async fn serve_stdio(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let server = ZoningServer::new(state);

    info!("starting stdio MCP transport");
    let service = server
        .serve_with_ct(stdio(), ct)
        .await
        .map_err(|err| AppError::Io(format!("stdio transport failed: {err}")))?;

    service
        .waiting()
        .await
        .map_err(|err| AppError::Io(format!("stdio service error: {err}")))?;

    info!("stdio MCP transport shut down");
    Ok(())
}
