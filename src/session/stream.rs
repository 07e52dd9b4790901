//! Server-to-client event stream bound to one session.

use std::convert::Infallible;
use std::sync::Arc;

use axum::response::sse::Event;
use futures_util::stream::{self, Stream};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::store::{Outbound, SessionHandle, SessionStore};
use crate::models::session::TransportKind;

/// Owns a session's receiving end for as long as the client stays connected.
///
/// Dropping the stream (client disconnect, write error, or session close)
/// closes streaming sessions outright. Request/response sessions survive a
/// detached stream and get their receiver back for the next attach.
#[derive(Debug)]
pub struct SessionStream {
    session: Arc<SessionHandle>,
    store: SessionStore,
    receiver: Option<mpsc::Receiver<Outbound>>,
}

impl SessionStream {
    pub(crate) fn new(
        session: Arc<SessionHandle>,
        store: SessionStore,
        receiver: mpsc::Receiver<Outbound>,
    ) -> Self {
        info!(session_id = %session.id(), "stream attached");
        Self {
            session,
            store,
            receiver: Some(receiver),
        }
    }

    /// Session this stream serves.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionHandle> {
        &self.session
    }

    /// Next queued frame, or `None` once the session closes.
    pub async fn next_frame(&mut self) -> Option<Outbound> {
        let cancel = self.session.cancellation().clone();
        let receiver = self.receiver.as_mut()?;
        tokio::select! {
            () = cancel.cancelled() => None,
            frame = receiver.recv() => frame,
        }
    }

    /// Adapt into an SSE event stream.
    pub fn into_events(self) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
        stream::unfold(self, |mut state| async move {
            let frame = state.next_frame().await?;
            Some((Ok::<_, Infallible>(to_event(&frame)), state))
        })
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        let id = self.session.id();
        match self.session.transport() {
            TransportKind::Streaming => {
                if self.store.remove(id).is_some() {
                    info!(session_id = %id, "stream disconnected, session closed");
                }
            }
            TransportKind::RequestResponse => {
                if let Some(receiver) = self.receiver.take() {
                    self.session.restore_receiver(receiver);
                }
                info!(session_id = %id, "stream detached");
            }
        }
    }
}

fn to_event(frame: &Outbound) -> Event {
    match frame {
        Outbound::Endpoint(path) => Event::default().event("endpoint").data(path),
        Outbound::Message(response) => {
            let data = serde_json::to_string(response).unwrap_or_else(|err| {
                warn!(%err, "failed to encode outbound message");
                String::from("{}")
            });
            Event::default().event("message").data(data)
        }
    }
}
