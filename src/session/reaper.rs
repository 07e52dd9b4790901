//! Background expiry of idle request/response sessions.
//!
//! Streaming sessions are bound to their connection and never reaped here;
//! neither is a request/response session while a stream is attached.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::manager::SessionManager;

const REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn the idle-session reaper.
///
/// The task wakes every minute and closes detached request/response
/// sessions idle for at least `idle_timeout`.
#[must_use]
pub fn spawn_session_reaper(
    manager: Arc<SessionManager>,
    idle_timeout: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REAP_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("session reaper shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let reaped = manager.reap_idle(idle_timeout);
                    debug!(reaped, active = manager.active_sessions(), "session reaper pass");
                }
            }
        }
    })
}
