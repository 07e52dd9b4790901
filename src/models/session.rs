//! Session lifecycle model.

use serde::Serialize;

/// Lifecycle state of a protocol session.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, identifier not yet registered.
    Pending,
    /// Identifier assigned and registered in the session table.
    Initialized,
    /// Client confirmed initialization.
    Active,
    /// Removed from the table; the identifier is dead.
    Closed,
}

impl SessionState {
    /// Determine whether a lifecycle transition is permitted.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Initialized | Self::Closed)
                | (Self::Initialized, Self::Active | Self::Closed)
                | (Self::Active, Self::Closed)
        )
    }

    /// Whether the session may still carry requests.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Initialized | Self::Active)
    }
}

/// Which inbound surface owns the session.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// `GET /sse` channel plus `POST /messages`.
    Streaming,
    /// `POST /mcp` calls correlated by header.
    RequestResponse,
}
