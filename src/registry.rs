//! Room registry
//!
//! Owns all room state: membership keyed by standardized username,
//! append-only message history, and room lifecycle (creation on first
//! join, deletion on last leave except the permanent default room).

use std::collections::HashMap;

use thiserror::Error;

use crate::message::MessageRecord;
use crate::types::ConnectionId;

/// Name of the permanent default room
///
/// Exists for the lifetime of the process regardless of membership.
pub const DEFAULT_ROOM: &str = "lobby";

/// Registry-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The username is already held by a member of the room
    #[error("Username already taken")]
    AlreadyTaken,
}

/// A room member's session info
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Connection holding this membership
    pub connection: ConnectionId,
    /// Standardized username (also the membership key)
    pub username: String,
}

/// A named chat room
///
/// Members are keyed by standardized username; history is append-only
/// and replayed verbatim to new joiners.
#[derive(Debug, Default)]
pub struct Room {
    members: HashMap<String, Member>,
    history: Vec<MessageRecord>,
}

impl Room {
    /// Insert a member under its standardized username
    ///
    /// Fails if the username is already present in this room.
    pub fn add_member(&mut self, member: Member) -> Result<(), RegistryError> {
        if self.members.contains_key(&member.username) {
            return Err(RegistryError::AlreadyTaken);
        }
        self.members.insert(member.username.clone(), member);
        Ok(())
    }

    /// Check whether a standardized username is a member of this room
    pub fn has_member(&self, username: &str) -> bool {
        self.members.contains_key(username)
    }

    /// Number of current members
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Resolve an optional room id to a room name, defaulting to [`DEFAULT_ROOM`]
pub fn resolve_room(room_id: Option<&str>) -> String {
    match room_id {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_ROOM.to_string(),
    }
}

/// Registry of all rooms
///
/// The only component that creates or deletes rooms. Reads on a
/// non-existent room return "not found" / empty; nothing but
/// [`RoomRegistry::ensure_room`] creates one.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    /// Create a registry holding only the permanent default room
    pub fn new() -> Self {
        let mut rooms = HashMap::new();
        rooms.insert(DEFAULT_ROOM.to_string(), Room::default());
        Self { rooms }
    }

    /// Return the room, creating an empty one if absent. Idempotent.
    pub fn ensure_room(&mut self, name: &str) -> &mut Room {
        self.rooms.entry(name.to_string()).or_default()
    }

    /// True iff the room exists and has at least one member
    pub fn room_is_live(&self, name: &str) -> bool {
        self.rooms
            .get(name)
            .is_some_and(|room| room.member_count() > 0)
    }

    /// Look up a room without creating it
    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    /// Remove a member; delete the room if it is non-default and now empty
    ///
    /// Deleting the room discards its history. No-op on unknown rooms.
    pub fn remove_member(&mut self, name: &str, username: &str) {
        let Some(room) = self.rooms.get_mut(name) else {
            return;
        };

        room.members.remove(username);

        if name != DEFAULT_ROOM && room.members.is_empty() {
            self.rooms.remove(name);
        }
    }

    /// Append a record to a room's history
    ///
    /// Guarded no-op if the room does not exist; never creates a room.
    pub fn append_message(&mut self, name: &str, record: MessageRecord) {
        if let Some(room) = self.rooms.get_mut(name) {
            room.history.push(record);
        }
    }

    /// Snapshot of the room's members at call time, sorted by username
    ///
    /// Empty for unknown rooms.
    pub fn list_members(&self, name: &str) -> Vec<Member> {
        let Some(room) = self.rooms.get(name) else {
            return Vec::new();
        };

        let mut members: Vec<Member> = room.members.values().cloned().collect();
        members.sort_by(|a, b| a.username.cmp(&b.username));
        members
    }

    /// The room's history in insertion order; empty for unknown rooms
    pub fn history(&self, name: &str) -> &[MessageRecord] {
        self.rooms
            .get(name)
            .map(|room| room.history.as_slice())
            .unwrap_or(&[])
    }
}
