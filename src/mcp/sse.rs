//! Streaming transport: `GET /sse` plus `POST /messages?sessionId=`.
//!
//! Each `GET /sse` owns one session for the lifetime of the connection. The
//! first event tells the client where to POST; responses come back on the
//! stream as `message` events and the POST itself is only acknowledged,
//! before the request is dispatched.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{error, info, warn};

use super::handler::AppState;
use super::protocol::{error_codes, parse_envelope, JsonRpcResponse};
use super::streamable::{rpc_response, with_session_header};
use crate::models::session::TransportKind;
use crate::session::manager::invalid_session;
use crate::session::SessionStream;

/// Query string of `POST /messages`.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    /// Target streaming session.
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// `GET /sse`: open a streaming session.
pub async fn open_sse(State(state): State<Arc<AppState>>) -> Response {
    match state.sessions.open_streaming().await {
        Ok(stream) => {
            let id = stream.session().id().to_owned();
            info!(session_id = %id, "sse channel opened");
            let response = event_stream_response(stream, state.config.keep_alive_interval());
            with_session_header(response, Some(&id))
        }
        Err(err) => {
            error!(%err, "failed to open sse channel");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

/// `POST /messages`: submit one envelope to an open streaming session.
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let session = query
        .session_id
        .as_deref()
        .and_then(|id| state.sessions.resolve(id, TransportKind::Streaming).ok());
    let Some(session) = session else {
        warn!(session_id = ?query.session_id, "message for unknown sse session");
        return rpc_response(StatusCode::BAD_REQUEST, &invalid_session(None), None);
    };

    let request = match parse_envelope(&body) {
        Ok(request) => request,
        Err(response) => return rpc_response(StatusCode::BAD_REQUEST, &response, None),
    };
    let id = request.id.clone();

    match state.sessions.deliver(&session, request) {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(err) if !session.is_open() => {
            warn!(session_id = %session.id(), %err, "message for closed sse session");
            rpc_response(StatusCode::BAD_REQUEST, &invalid_session(id), None)
        }
        Err(err) => {
            error!(session_id = %session.id(), %err, "failed to queue sse message");
            rpc_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &JsonRpcResponse::error(
                    id,
                    error_codes::INTERNAL_ERROR,
                    "Session message backlog is full",
                ),
                None,
            )
        }
    }
}

/// SSE response over `stream` with periodic keep-alive comments.
///
/// The keep-alive timer lives inside the response body and is dropped with
/// it when the client disconnects or the session closes.
pub(crate) fn event_stream_response(stream: SessionStream, keep_alive: Duration) -> Response {
    let sse = Sse::new(stream.into_events())
        .keep_alive(KeepAlive::new().interval(keep_alive).text("ping"));
    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        sse,
    )
        .into_response()
}
