//! Active-session table.
//!
//! The table is the only shared mutable state of the transport layer. Every
//! mutation happens under one write lock, so a session is either fully
//! registered or absent. Handles are reference counted: a request that
//! resolved a handle just before it was closed still sees `Closed` and is
//! rejected rather than misrouted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::models::session::{SessionState, TransportKind};
use crate::{AppError, Result};

/// Frames buffered per session before senders wait for the stream reader.
const OUTBOUND_CAPACITY: usize = 64;

/// Requests accepted per session ahead of its message worker.
pub(crate) const INBOUND_CAPACITY: usize = 64;

/// Frame queued for a session's server-to-client stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Where the client must POST its messages.
    Endpoint(String),
    /// A response to a client request.
    Message(JsonRpcResponse),
}

/// One live session.
#[derive(Debug)]
pub struct SessionHandle {
    id: String,
    transport: TransportKind,
    created_at: DateTime<Utc>,
    state: Mutex<SessionState>,
    last_activity: Mutex<Instant>,
    outbound: mpsc::Sender<Outbound>,
    receiver: Mutex<Option<mpsc::Receiver<Outbound>>>,
    inbound: OnceLock<mpsc::Sender<JsonRpcRequest>>,
    dispatch_lock: tokio::sync::Mutex<()>,
    cancel: CancellationToken,
}

impl SessionHandle {
    fn new(id: String, transport: TransportKind) -> Self {
        let (outbound, receiver) = mpsc::channel(OUTBOUND_CAPACITY);
        Self {
            id,
            transport,
            created_at: Utc::now(),
            state: Mutex::new(SessionState::Pending),
            last_activity: Mutex::new(Instant::now()),
            outbound,
            receiver: Mutex::new(Some(receiver)),
            inbound: OnceLock::new(),
            dispatch_lock: tokio::sync::Mutex::new(()),
            cancel: CancellationToken::new(),
        }
    }

    /// Opaque session identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Surface that created the session.
    #[must_use]
    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Wall-clock time since creation.
    #[must_use]
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.created_at
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the session still accepts requests.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Move to `next` if the lifecycle allows it. Returns whether it moved.
    pub fn transition(&self, next: SessionState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.can_transition_to(next) {
            debug!(session_id = %self.id, from = ?*state, to = ?next, "session state change");
            *state = next;
            true
        } else {
            false
        }
    }

    /// Record activity now.
    pub fn touch(&self) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Time since the last recorded activity.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    /// Whether a stream currently owns the receiving end.
    #[must_use]
    pub fn has_stream(&self) -> bool {
        self.receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Queue a frame for the attached stream.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the session is closed or its stream
    /// receiver has been dropped.
    pub async fn send(&self, frame: Outbound) -> Result<()> {
        if !self.is_open() {
            return Err(AppError::Session(format!("session {} is closed", self.id)));
        }
        self.outbound
            .send(frame)
            .await
            .map_err(|_| AppError::Session(format!("stream for session {} is gone", self.id)))
    }

    /// Take the receiving end for a new stream, if none is attached.
    pub(crate) fn take_receiver(&self) -> Option<mpsc::Receiver<Outbound>> {
        self.receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Hand the receiving end back after a stream detaches.
    pub(crate) fn restore_receiver(&self, receiver: mpsc::Receiver<Outbound>) {
        *self.receiver.lock().unwrap_or_else(PoisonError::into_inner) = Some(receiver);
    }

    /// Install the queue feeding this session's message worker. Returns
    /// `false` if one is already installed.
    pub(crate) fn set_inbound(&self, sender: mpsc::Sender<JsonRpcRequest>) -> bool {
        self.inbound.set(sender).is_ok()
    }

    /// Hand a request to the session's message worker without waiting for it
    /// to be dispatched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the session is closed, has no worker,
    /// or already holds a full backlog.
    pub fn enqueue(&self, request: JsonRpcRequest) -> Result<()> {
        if !self.is_open() {
            return Err(AppError::Session(format!("session {} is closed", self.id)));
        }
        let Some(inbound) = self.inbound.get() else {
            return Err(AppError::Session(format!(
                "session {} has no message worker",
                self.id
            )));
        };
        inbound.try_send(request).map_err(|err| match err {
            TrySendError::Full(_) => {
                AppError::Session(format!("message backlog for session {} is full", self.id))
            }
            TrySendError::Closed(_) => {
                AppError::Session(format!("session {} is closed", self.id))
            }
        })
    }

    /// Serializes dispatch within the session.
    pub(crate) fn dispatch_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.dispatch_lock
    }

    /// Fires when the session closes.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn close(&self) {
        self.transition(SessionState::Closed);
        self.cancel.cancel();
    }
}

/// Concurrent map of live sessions, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Arc<SessionHandle>>>>,
}

impl SessionStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a session under a fresh identifier.
    ///
    /// The handle is moved to `Initialized` before it becomes visible.
    #[must_use]
    pub fn create(&self, transport: TransportKind) -> Arc<SessionHandle> {
        let mut table = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut id = Uuid::new_v4().to_string();
        while table.contains_key(&id) {
            id = Uuid::new_v4().to_string();
        }

        let handle = Arc::new(SessionHandle::new(id.clone(), transport));
        handle.transition(SessionState::Initialized);
        table.insert(id, Arc::clone(&handle));
        info!(session_id = %handle.id, ?transport, active = table.len(), "session created");
        handle
    }

    /// Look up an open session.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<SessionHandle>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Unregister and close a session. Returns the handle if it was live.
    pub fn remove(&self, id: &str) -> Option<Arc<SessionHandle>> {
        let removed = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if let Some(handle) = &removed {
            handle.close();
            info!(session_id = %id, age_secs = handle.age().num_seconds(), "session closed");
        }
        removed
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no session is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close request/response sessions without an attached stream that have
    /// been idle for at least `ttl`. Returns the closed identifiers.
    pub fn reap_idle(&self, ttl: Duration) -> Vec<String> {
        let mut table = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let expired: Vec<String> = table
            .values()
            .filter(|handle| {
                handle.transport == TransportKind::RequestResponse
                    && !handle.has_stream()
                    && handle.idle_for() >= ttl
            })
            .map(|handle| handle.id.clone())
            .collect();

        for id in &expired {
            if let Some(handle) = table.remove(id) {
                handle.close();
                debug!(
                    session_id = %id,
                    age_secs = handle.age().num_seconds(),
                    "idle session removed"
                );
            }
        }
        expired
    }

    /// Close every session.
    pub fn close_all(&self) -> usize {
        let drained: Vec<Arc<SessionHandle>> = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        for handle in &drained {
            handle.close();
        }
        drained.len()
    }
}
