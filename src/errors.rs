//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Caller input rejected locally before any upstream call.
    Validation(String),
    /// Upstream feature service did not answer within the request timeout.
    Timeout(String),
    /// Upstream feature service answered with a non-success HTTP status.
    UpstreamStatus {
        /// HTTP status code returned by the upstream service.
        status: u16,
        /// Raw response body, kept for diagnostics.
        body: String,
    },
    /// Upstream answered successfully but the payload carried an error object
    /// or could not be decoded.
    Upstream(String),
    /// Network failure talking to the upstream service.
    Http(String),
    /// Missing, unknown, or expired session identifier.
    Session(String),
    /// Tool name not present in the registry.
    UnknownTool(String),
    /// Malformed protocol envelope.
    Protocol(String),
    /// File-system or socket I/O failure.
    Io(String),
}

impl AppError {
    /// Whether this error belongs to the categories reported back to the
    /// calling agent as a tool result rather than as a transport fault.
    #[must_use]
    pub fn is_tool_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Timeout(_)
                | Self::UpstreamStatus { .. }
                | Self::Upstream(_)
                | Self::Http(_)
                | Self::UnknownTool(_)
        )
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Validation(msg) => write!(f, "invalid input: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::UpstreamStatus { status, body } => {
                write!(f, "upstream query failed: {status} - {body}")
            }
            Self::Upstream(msg) => write!(f, "upstream error: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
            Self::Session(msg) => write!(f, "invalid session: {msg}"),
            Self::UnknownTool(name) => write!(f, "unknown tool: {name}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout("feature service took too long to respond".into())
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
