//! Transport-side connection bookkeeping
//!
//! Tracks each connection's outbound channel and the room groups the
//! coordinator has associated it with. Group membership here is
//! deliberately separate from the registry's username-keyed membership;
//! the coordinator keeps the two in sync.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;

use crate::message::ServerEvent;
use crate::types::ConnectionId;

/// A connected peer's outbound channel
///
/// Sends are fire-and-forget: the channel is unbounded and a closed
/// receiver (peer already gone) is ignored.
#[derive(Debug, Clone)]
pub struct Peer {
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl Peer {
    /// Wrap an outbound sender channel
    pub fn new(sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self { sender }
    }

    /// Send an event to this peer
    pub fn send(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

/// Transport-layer peer and group bookkeeping
///
/// Supports emitting an event to one connection, to every connection in
/// a room, or to every connection in a room except one.
#[derive(Debug, Default)]
pub struct PeerMap {
    peers: HashMap<ConnectionId, Peer>,
    groups: HashMap<String, HashSet<ConnectionId>>,
}

impl PeerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly connected peer
    pub fn register(&mut self, connection: ConnectionId, sender: mpsc::UnboundedSender<ServerEvent>) {
        self.peers.insert(connection, Peer::new(sender));
    }

    /// Drop a peer and purge it from every room group
    pub fn unregister(&mut self, connection: ConnectionId) {
        self.peers.remove(&connection);
        self.groups.retain(|_, members| {
            members.remove(&connection);
            !members.is_empty()
        });
    }

    /// Associate a connection with a room group
    pub fn join_room(&mut self, room: &str, connection: ConnectionId) {
        self.groups
            .entry(room.to_string())
            .or_default()
            .insert(connection);
    }

    /// Dissociate a connection from a room group
    pub fn leave_room(&mut self, room: &str, connection: ConnectionId) {
        if let Some(members) = self.groups.get_mut(room) {
            members.remove(&connection);
            if members.is_empty() {
                self.groups.remove(room);
            }
        }
    }

    /// Send an event to one connection
    pub fn send_to(&self, connection: ConnectionId, event: ServerEvent) {
        if let Some(peer) = self.peers.get(&connection) {
            peer.send(event);
        }
    }

    /// Send an event to every connection in a room
    pub fn broadcast(&self, room: &str, event: ServerEvent) {
        let Some(members) = self.groups.get(room) else {
            return;
        };
        for connection in members {
            if let Some(peer) = self.peers.get(connection) {
                peer.send(event.clone());
            }
        }
    }

    /// Send an event to every connection in a room except one
    pub fn broadcast_except(&self, room: &str, except: ConnectionId, event: ServerEvent) {
        let Some(members) = self.groups.get(room) else {
            return;
        };
        for connection in members.iter().filter(|c| **c != except) {
            if let Some(peer) = self.peers.get(connection) {
                peer.send(event.clone());
            }
        }
    }
}
