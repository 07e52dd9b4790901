//! Session transport manager.
//!
//! Owns the [`SessionStore`] and drives every session through its lifecycle
//! on behalf of both HTTP surfaces. Requests within one session are
//! dispatched one at a time, in arrival order; sessions are independent of
//! each other.
//!
//! Streaming sessions get a message worker task: `POST /messages` only
//! queues the request, and the worker dispatches it and writes the response
//! to the session's stream.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

use super::store::{Outbound, SessionHandle, SessionStore, INBOUND_CAPACITY};
use super::stream::SessionStream;
use crate::mcp::dispatcher::ProtocolDispatcher;
use crate::mcp::protocol::{
    error_codes, JsonRpcRequest, JsonRpcResponse, DEFAULT_PROTOCOL_VERSION,
};
use crate::models::session::{SessionState, TransportKind};
use crate::{AppError, Result};

/// Correlation id of the synthetic `initialize` issued for stateless callers.
const AUTO_INIT_REQUEST_ID: &str = "auto-init";

/// Path the streaming client must POST to, relative to the server root.
#[must_use]
pub fn message_endpoint(session_id: &str) -> String {
    format!("/messages?sessionId={session_id}")
}

/// Creates, resolves, and closes sessions and routes their requests.
pub struct SessionManager {
    store: SessionStore,
    dispatcher: Arc<ProtocolDispatcher>,
}

impl SessionManager {
    /// Manager over an empty store.
    #[must_use]
    pub fn new(dispatcher: Arc<ProtocolDispatcher>) -> Self {
        Self {
            store: SessionStore::new(),
            dispatcher,
        }
    }

    /// Underlying session table.
    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Dispatcher shared by all sessions.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<ProtocolDispatcher> {
        &self.dispatcher
    }

    /// Number of live sessions.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.store.len()
    }

    /// Resolve an open session created by `transport`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the identifier is unknown, closed, or
    /// belongs to the other transport.
    pub fn resolve(&self, id: &str, transport: TransportKind) -> Result<Arc<SessionHandle>> {
        self.store
            .get(id)
            .filter(|handle| handle.transport() == transport && handle.is_open())
            .ok_or_else(|| AppError::Session(format!("unknown session {id}")))
    }

    /// Open a streaming session and queue its endpoint announcement.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the endpoint frame cannot be queued.
    pub async fn open_streaming(&self) -> Result<SessionStream> {
        let session = self.store.create(TransportKind::Streaming);
        let Some(receiver) = session.take_receiver() else {
            self.store.remove(session.id());
            return Err(AppError::Session("new session has no receiver".into()));
        };
        let (inbound, requests) = mpsc::channel(INBOUND_CAPACITY);
        session.set_inbound(inbound);
        tokio::spawn(run_message_worker(
            Arc::clone(&self.dispatcher),
            Arc::clone(&session),
            requests,
        ));
        let stream = SessionStream::new(Arc::clone(&session), self.store.clone(), receiver);
        session
            .send(Outbound::Endpoint(message_endpoint(session.id())))
            .await?;
        Ok(stream)
    }

    /// Attach a stream to a request/response session.
    ///
    /// Returns `None` if a stream is already attached.
    #[must_use]
    pub fn attach_stream(&self, session: Arc<SessionHandle>) -> Option<SessionStream> {
        let receiver = session.take_receiver()?;
        Some(SessionStream::new(session, self.store.clone(), receiver))
    }

    /// Explicit session start: create a request/response session and answer
    /// the caller's `initialize` within it.
    pub async fn start(
        &self,
        request: JsonRpcRequest,
    ) -> (Arc<SessionHandle>, Option<JsonRpcResponse>) {
        let session = self.store.create(TransportKind::RequestResponse);
        let response = self.handle(&session, request).await;
        (session, response)
    }

    /// Synthesize a session for a caller that skipped `initialize`.
    ///
    /// Runs an internal `initialize` exchange through the dispatcher and
    /// discards its response, then marks the session active as if the
    /// client had confirmed.
    pub async fn auto_initialize(&self) -> Arc<SessionHandle> {
        let session = self.store.create(TransportKind::RequestResponse);
        let span = info_span!("auto_initialize", session_id = %session.id());

        async {
            let synthetic = JsonRpcRequest::new("initialize")
                .with_id(AUTO_INIT_REQUEST_ID)
                .with_params(json!({
                    "protocolVersion": DEFAULT_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": { "name": "auto-initialized-client", "version": "1.0.0" },
                }));

            let _guard = session.dispatch_lock().lock().await;
            drop(self.dispatcher.dispatch(synthetic).await);
            session.transition(SessionState::Active);
            session.touch();
            info!("stateless caller auto-initialized");
        }
        .instrument(span)
        .await;

        session
    }

    /// Route one request through `session`. Notifications yield `None`.
    pub async fn handle(
        &self,
        session: &SessionHandle,
        request: JsonRpcRequest,
    ) -> Option<JsonRpcResponse> {
        dispatch_in_session(&self.dispatcher, session, request).await
    }

    /// Queue one request on a streaming session. Its worker dispatches it
    /// in arrival order and writes the response to the session's stream.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the session is closed or its backlog
    /// is full.
    pub fn deliver(&self, session: &SessionHandle, request: JsonRpcRequest) -> Result<()> {
        session.enqueue(request)
    }

    /// Explicitly close a session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if `id` does not name a live session.
    pub fn terminate(&self, id: &str) -> Result<()> {
        self.store
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AppError::Session(format!("unknown session {id}")))
    }

    /// Close idle detached request/response sessions.
    pub fn reap_idle(&self, ttl: Duration) -> usize {
        let reaped = self.store.reap_idle(ttl);
        for id in &reaped {
            info!(session_id = %id, "idle session reaped");
        }
        reaped.len()
    }

    /// Close every session.
    pub fn shutdown(&self) {
        let closed = self.store.close_all();
        info!(closed, "all sessions closed");
    }
}

/// Dispatch `request` within `session`, holding its dispatch lock.
async fn dispatch_in_session(
    dispatcher: &ProtocolDispatcher,
    session: &SessionHandle,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    let _guard = session.dispatch_lock().lock().await;
    if !session.is_open() {
        warn!(session_id = %session.id(), method = %request.method, "request for closed session");
        return (!request.is_notification()).then(|| {
            JsonRpcResponse::error(
                request.id,
                error_codes::INVALID_SESSION,
                "Invalid session: session is closed",
            )
        });
    }

    session.touch();
    if request.method == "notifications/initialized" {
        session.transition(SessionState::Active);
    }

    let span = info_span!(
        "session_request",
        session_id = %session.id(),
        method = %request.method
    );
    let response = dispatcher.dispatch(request).instrument(span).await;
    session.touch();
    response
}

/// Drain a streaming session's queued requests until it closes.
async fn run_message_worker(
    dispatcher: Arc<ProtocolDispatcher>,
    session: Arc<SessionHandle>,
    mut requests: mpsc::Receiver<JsonRpcRequest>,
) {
    let cancel = session.cancellation().clone();
    let span = info_span!("message_worker", session_id = %session.id());

    async {
        loop {
            let request = tokio::select! {
                () = cancel.cancelled() => break,
                request = requests.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            let Some(response) = dispatch_in_session(&dispatcher, &session, request).await else {
                continue;
            };
            tokio::select! {
                () = cancel.cancelled() => break,
                sent = session.send(Outbound::Message(response)) => {
                    if let Err(err) = sent {
                        warn!(%err, "dropping response for detached stream");
                        break;
                    }
                }
            }
        }
        debug!("message worker stopped");
    }
    .instrument(span)
    .await;
}

/// Rejection sent when `POST /messages` names no open streaming session.
#[must_use]
pub fn invalid_session(id: Option<serde_json::Value>) -> JsonRpcResponse {
    JsonRpcResponse::error(
        id,
        error_codes::INVALID_SESSION,
        "Invalid session. Please establish SSE connection first.",
    )
}
