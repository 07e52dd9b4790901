//! HTTP server: router assembly, health probe, and lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderName, Method};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handler::AppState;
use super::sse::{open_sse, post_message};
use super::streamable::{delete_mcp, get_mcp, post_mcp, SESSION_HEADER};
use crate::{AppError, Result};

/// Handler for `GET /health`.
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let details = state.sessions.dispatcher().identity();
    Json(json!({
        "status": "ok",
        "name": details.name,
        "version": details.version,
        "activeSessions": state.sessions.active_sessions(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Build the full HTTP router over `state`.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let session_header = HeaderName::from_static(SESSION_HEADER);
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CACHE_CONTROL,
            session_header.clone(),
        ])
        .expose_headers([session_header]);

    Router::new()
        .route("/health", get(health))
        .route("/mcp", get(get_mcp).post(post_mcp).delete(delete_mcp))
        .route("/sse", get(open_sse))
        .route("/messages", post(post_message))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve on an already-bound listener until `ct` fires.
///
/// Open sessions are closed on shutdown so their streams end and the
/// graceful drain can complete.
///
/// # Errors
///
/// Returns `AppError::Io` if the server fails while running.
pub async fn serve_listener(
    listener: TcpListener,
    state: Arc<AppState>,
    ct: CancellationToken,
) -> Result<()> {
    let sessions = Arc::clone(&state.sessions);
    let app = router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            ct.cancelled().await;
            sessions.shutdown();
        })
        .await?;

    info!("HTTP MCP transport shut down");
    Ok(())
}

/// Bind `config.bind_address:config.http_port` and serve.
///
/// # Errors
///
/// Returns `AppError::Config` if the address cannot be bound, or
/// `AppError::Io` if the server fails while running.
pub async fn serve_http(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let bind = SocketAddr::new(state.config.bind_address, state.config.http_port);
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind {bind}: {err}")))?;

    info!(%bind, "starting HTTP MCP transport");
    serve_listener(listener, state, ct).await
}
