//! Error types for the chat relay
//!
//! Defines transport-level errors and the join rejection reasons.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers fatal errors on the transport path: WebSocket protocol
/// failures, serialization failures, and broken internal channels.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,
}

/// Reasons a join request is rejected
///
/// Surfaced only to the requesting connection as a `join_error` event.
/// Never fatal and never retried by the server; the client resubmits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// Username failed the format rules
    #[error("{0}")]
    InvalidUsername(String),

    /// Username already held by a member of the room
    #[error("Username is already taken in this room.")]
    UsernameTaken,
}
