//! Branded ID newtypes.
//!
//! Connection IDs wrap a `String` so they cannot be confused with identity
//! tags (user IDs), which are also plain strings on the wire. Fresh IDs are
//! UUID v7 (time-ordered) with a `conn_` prefix.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const CONNECTION_PREFIX: &str = "conn_";

/// Process-unique identifier of one live WebSocket connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a new random ID (`conn_` + UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(format!("{CONNECTION_PREFIX}{}", Uuid::now_v7()))
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for ConnectionId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
