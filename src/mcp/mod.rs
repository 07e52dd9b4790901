//! Model Context Protocol server layer.

pub mod dispatcher;
pub mod handler;
pub mod protocol;
pub mod server;
pub mod sse;
pub mod streamable;
pub mod tools;
pub mod transport;
