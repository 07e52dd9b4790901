//! Session transport management shared by the HTTP surfaces.

pub mod manager;
pub mod reaper;
pub mod store;
pub mod stream;

pub use manager::SessionManager;
pub use store::{Outbound, SessionHandle, SessionStore};
pub use stream::SessionStream;
