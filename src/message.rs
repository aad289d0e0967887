//! Message protocol definitions
//!
//! JSON-based bidirectional event protocol using Serde's tagged enum
//! for type-safe serialization/deserialization, plus the history record
//! type shared between the registry and the wire.

use serde::{Deserialize, Serialize};

use crate::error::JoinError;

/// Client → Server event
///
/// All events from client to server. Uses tagged enum with snake_case
/// naming. `room_id` is optional everywhere; a missing or empty value
/// resolves to the permanent default room.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Ask whether a room currently has any members
    CheckRoom { room_id: Option<String> },
    /// Join a room under the given username
    JoinRoom {
        username: String,
        room_id: Option<String>,
    },
    /// Send a chat message to a room
    SendMessage {
        message: Incoming,
        room_id: Option<String>,
    },
    /// Indicate typing in a room
    Typing { room_id: Option<String> },
    /// Leave a room
    LeaveRoom { room_id: Option<String> },
}

/// Client-supplied chat message payload
///
/// Fields default to empty so a malformed payload still parses; the
/// coordinator validates and silently drops incomplete messages.
#[derive(Debug, Clone, Deserialize)]
pub struct Incoming {
    /// Sender's display username
    #[serde(default)]
    pub username: String,
    /// Message body text
    #[serde(default)]
    pub body: String,
    /// Client-supplied timestamp in milliseconds
    pub timestamp: Option<i64>,
}

/// A record in a room's history
///
/// Chat records carry client-supplied data plus server-assigned identity;
/// system records are server-generated join/leave notifications. Records
/// are immutable once appended and are replayed verbatim to new joiners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageRecord {
    /// A chat message relayed from a client
    Chat {
        /// Server-assigned unique id
        id: String,
        /// Sender's username as supplied
        sender: String,
        /// Message body text
        body: String,
        /// Client-supplied timestamp in milliseconds
        timestamp: i64,
        /// Identity of the originating connection
        connection_id: String,
    },
    /// A server-generated notification
    System {
        /// Server-assigned unique id
        id: String,
        /// Notification text
        text: String,
        /// Server timestamp in milliseconds
        timestamp: i64,
    },
}

/// Server → Client event
///
/// All events from server to client. Uses tagged enum with snake_case naming.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Reply to a room check
    RoomChecked { live: bool },
    /// Full room history, delivered to a joiner before live broadcasts
    ChatHistory { messages: Vec<MessageRecord> },
    /// Current member list of a room
    UserList { room: String, users: Vec<String> },
    /// A join/leave notification
    SystemMessage { message: MessageRecord },
    /// A relayed chat message
    ReceiveMessage { message: MessageRecord },
    /// Another member is typing
    UserTyping {
        connection_id: String,
        username: String,
    },
    /// Join accepted
    JoinSuccess { room: String },
    /// Join rejected
    JoinError { code: JoinErrorCode, message: String },
}

/// Rejection codes for ServerEvent::JoinError
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinErrorCode {
    /// Username failed the format rules
    InvalidUsername,
    /// Username already held by a member of the room
    UsernameTaken,
}

/// Convert a JoinError into the event sent back to the requester
impl From<JoinError> for ServerEvent {
    fn from(err: JoinError) -> Self {
        let (code, message) = match &err {
            JoinError::InvalidUsername(reason) => {
                (JoinErrorCode::InvalidUsername, reason.clone())
            }
            JoinError::UsernameTaken => {
                (JoinErrorCode::UsernameTaken, err.to_string())
            }
        };
        ServerEvent::JoinError { code, message }
    }
}
