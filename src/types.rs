//! Basic type definitions for the chat relay
//!
//! Provides newtype wrappers and small abstractions:
//! - `ConnectionId`: UUID-based unique connection identifier
//! - `IdSource`: pluggable generator for server-assigned message ids

use uuid::Uuid;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe identification of a live connection.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generator for server-assigned message ids
///
/// The coordinator stamps every history record with an id from this
/// source. Production uses random UUIDs; tests inject `SequentialIdSource`
/// for deterministic output.
pub trait IdSource {
    /// Produce the next unique id
    fn next_id(&mut self) -> String;
}

/// UUID v4 id source used in production
#[derive(Debug, Default)]
pub struct UuidIdSource;

impl IdSource for UuidIdSource {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Monotonic counter id source for deterministic tests
#[derive(Debug, Default)]
pub struct SequentialIdSource {
    next: u64,
}

impl IdSource for SequentialIdSource {
    fn next_id(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        format!("msg-{}", id)
    }
}
