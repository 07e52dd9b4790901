#![forbid(unsafe_code)]

//! Zoning district lookups exposed as MCP tools over HTTP and stdio.

pub mod arcgis;
pub mod config;
pub mod errors;
pub mod lookup;
pub mod mcp;
pub mod models;
pub mod session;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
