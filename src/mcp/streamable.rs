//! Request/response transport on `/mcp`.
//!
//! Sessions are correlated by the `mcp-session-id` header. A caller that
//! never sends `initialize` is given a session transparently on its first
//! call and learns its identifier from the response header.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, warn};

use super::handler::AppState;
use super::protocol::{error_codes, parse_envelope, JsonRpcResponse};
use super::sse::event_stream_response;
use crate::models::session::TransportKind;

/// Header carrying the session identifier in both directions.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Session identifier sent by the caller, if any.
#[must_use]
pub fn session_id_from(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// `POST /mcp`: route one envelope, creating a session when needed.
pub async fn post_mcp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match parse_envelope(&body) {
        Ok(request) => request,
        Err(response) => return rpc_response(StatusCode::BAD_REQUEST, &response, None),
    };
    let manager = &state.sessions;

    let (session, response) = match session_id_from(&headers) {
        Some(id) => {
            let Ok(session) = manager.resolve(id, TransportKind::RequestResponse) else {
                warn!(session_id = %id, method = %request.method, "request for unknown session");
                return rpc_response(
                    StatusCode::NOT_FOUND,
                    &JsonRpcResponse::error(
                        request.id,
                        error_codes::INVALID_SESSION,
                        "Invalid session: session not found",
                    ),
                    None,
                );
            };
            let response = manager.handle(&session, request).await;
            (session, response)
        }
        None if request.is_initialize() => manager.start(request).await,
        None => {
            let session = manager.auto_initialize().await;
            let response = manager.handle(&session, request).await;
            (session, response)
        }
    };

    match response {
        Some(response) => rpc_response(StatusCode::OK, &response, Some(session.id())),
        None => with_session_header(StatusCode::ACCEPTED.into_response(), Some(session.id())),
    }
}

/// `GET /mcp`: attach a stream to a session, or describe the server when no
/// session header is present.
pub async fn get_mcp(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(id) = session_id_from(&headers) else {
        return Json(discovery(&state)).into_response();
    };

    let Ok(session) = state.sessions.resolve(id, TransportKind::RequestResponse) else {
        return rpc_response(
            StatusCode::NOT_FOUND,
            &JsonRpcResponse::error(
                None,
                error_codes::INVALID_SESSION,
                "Invalid session: session not found",
            ),
            None,
        );
    };

    match state.sessions.attach_stream(session) {
        Some(stream) => {
            let id = stream.session().id().to_owned();
            let response = event_stream_response(stream, state.config.keep_alive_interval());
            with_session_header(response, Some(&id))
        }
        None => rpc_response(
            StatusCode::CONFLICT,
            &JsonRpcResponse::error(
                None,
                error_codes::INVALID_REQUEST,
                "a stream is already attached to this session",
            ),
            Some(id),
        ),
    }
}

/// `DELETE /mcp`: terminate the session named by the header.
pub async fn delete_mcp(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(id) = session_id_from(&headers) else {
        return rpc_response(
            StatusCode::BAD_REQUEST,
            &JsonRpcResponse::error(
                None,
                error_codes::INVALID_SESSION,
                "Invalid session: mcp-session-id header is required",
            ),
            None,
        );
    };

    match state.sessions.terminate(id) {
        Ok(()) => {
            debug!(session_id = %id, "session terminated by client");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => {
            warn!(session_id = %id, %err, "terminate for unknown session");
            rpc_response(
                StatusCode::NOT_FOUND,
                &JsonRpcResponse::error(
                    None,
                    error_codes::INVALID_SESSION,
                    "Invalid session: session not found",
                ),
                None,
            )
        }
    }
}

fn discovery(state: &AppState) -> serde_json::Value {
    let details = state.sessions.dispatcher().identity();
    let tools: Vec<&str> = state
        .registry()
        .descriptors()
        .map(|descriptor| descriptor.name.as_str())
        .collect();
    json!({
        "name": details.name,
        "version": details.version,
        "capabilities": { "tools": {} },
        "tools": tools,
        "sessionHeader": SESSION_HEADER,
        "endpoints": {
            "mcp": "/mcp",
            "sse": "/sse",
            "messages": "/messages",
            "health": "/health",
        },
    })
}

/// JSON-RPC body with `status`, optionally tagged with the session header.
pub(crate) fn rpc_response(
    status: StatusCode,
    body: &JsonRpcResponse,
    session_id: Option<&str>,
) -> Response {
    with_session_header((status, Json(body)).into_response(), session_id)
}

pub(crate) fn with_session_header(mut response: Response, session_id: Option<&str>) -> Response {
    if let Some(value) = session_id.and_then(|id| HeaderValue::from_str(id).ok()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}
