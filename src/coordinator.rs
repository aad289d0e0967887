//! Session coordinator actor
//!
//! The central actor that validates and sequences the join/leave/message/
//! typing protocol against the room registry and decides what to broadcast.
//! Uses the Actor pattern with mpsc channels for message passing.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::JoinError;
use crate::message::{Incoming, MessageRecord, ServerEvent};
use crate::registry::{resolve_room, Member, RoomRegistry};
use crate::transport::PeerMap;
use crate::types::{ConnectionId, IdSource, UuidIdSource};
use crate::username;

/// Commands sent from connection handlers to the coordinator actor
#[derive(Debug)]
pub enum Command {
    /// New connection established
    Connect {
        connection: ConnectionId,
        sender: mpsc::UnboundedSender<ServerEvent>,
    },
    /// Connection lost
    Disconnect {
        connection: ConnectionId,
    },
    /// Ask whether a room currently has any members
    CheckRoom {
        room_id: Option<String>,
        reply: oneshot::Sender<bool>,
    },
    /// Join a room under a username
    Join {
        connection: ConnectionId,
        username: String,
        room_id: Option<String>,
    },
    /// Relay a chat message to a room
    Message {
        connection: ConnectionId,
        message: Incoming,
        room_id: Option<String>,
    },
    /// Typing indicator
    Typing {
        connection: ConnectionId,
        room_id: Option<String>,
    },
    /// Explicitly leave a room
    Leave {
        connection: ConnectionId,
        room_id: Option<String>,
    },
}

/// Binding of one connection to one (username, room) pair
///
/// A connection has at most one active session at any time.
#[derive(Debug, Clone)]
pub struct Session {
    /// Standardized username, also the room membership key
    pub username: String,
    /// Room the session is bound to
    pub room: String,
}

/// The session coordinator actor
///
/// Owns the room registry, the connection-to-session reverse index, and
/// the transport-side peer map. Commands are processed strictly one at a
/// time; each multi-step sequence completes before the next command is
/// taken, so no locking is needed. Event handlers are synchronous and
/// outbound delivery is fire-and-forget.
pub struct Coordinator {
    /// All room state
    registry: RoomRegistry,
    /// Reverse index: connection -> active session
    sessions: HashMap<ConnectionId, Session>,
    /// Transport-side peers and room groups
    peers: PeerMap,
    /// Server-assigned message id generator
    ids: Box<dyn IdSource + Send>,
    /// Command receiver channel
    receiver: mpsc::Receiver<Command>,
}

impl Coordinator {
    /// Create a coordinator with the given command receiver
    pub fn new(receiver: mpsc::Receiver<Command>) -> Self {
        Self::with_id_source(receiver, Box::new(UuidIdSource))
    }

    /// Create a coordinator with an injected message id generator
    pub fn with_id_source(
        receiver: mpsc::Receiver<Command>,
        ids: Box<dyn IdSource + Send>,
    ) -> Self {
        Self {
            registry: RoomRegistry::new(),
            sessions: HashMap::new(),
            peers: PeerMap::new(),
            ids,
            receiver,
        }
    }

    /// Run the coordinator event loop
    ///
    /// Continuously receives and processes commands until all senders are
    /// dropped.
    pub async fn run(mut self) {
        info!("Coordinator started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("Coordinator shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect { connection, sender } => {
                self.handle_connect(connection, sender);
            }
            Command::Disconnect { connection } => {
                self.handle_disconnect(connection);
            }
            Command::CheckRoom { room_id, reply } => {
                self.handle_check_room(room_id, reply);
            }
            Command::Join {
                connection,
                username,
                room_id,
            } => {
                self.handle_join(connection, username, room_id);
            }
            Command::Message {
                connection,
                message,
                room_id,
            } => {
                self.handle_message(connection, message, room_id);
            }
            Command::Typing {
                connection,
                room_id,
            } => {
                self.handle_typing(connection, room_id);
            }
            Command::Leave {
                connection,
                room_id,
            } => {
                self.handle_leave(connection, room_id);
            }
        }
    }

    /// Handle new connection
    fn handle_connect(
        &mut self,
        connection: ConnectionId,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) {
        info!("Connection {} established", connection);
        self.peers.register(connection, sender);
    }

    /// Handle connection loss
    ///
    /// Like an explicit leave of the session's own room, except the
    /// departed connection hears nothing. The reverse-index entry and the
    /// peer registration go away regardless of session state.
    fn handle_disconnect(&mut self, connection: ConnectionId) {
        info!("Connection {} disconnected", connection);

        if let Some(session) = self.sessions.remove(&connection) {
            let record = self.system_record(format!("{} left the chat", session.username));
            self.registry.append_message(&session.room, record.clone());
            self.peers.broadcast_except(
                &session.room,
                connection,
                ServerEvent::SystemMessage { message: record },
            );

            self.registry.remove_member(&session.room, &session.username);
            self.peers.leave_room(&session.room, connection);
            self.broadcast_user_list(&session.room);
        }

        self.peers.unregister(connection);
    }

    /// Handle a room liveness query. Pure read, replied directly.
    fn handle_check_room(&self, room_id: Option<String>, reply: oneshot::Sender<bool>) {
        let room = resolve_room(room_id.as_deref());
        let _ = reply.send(self.registry.room_is_live(&room));
    }

    /// Handle a join request
    fn handle_join(
        &mut self,
        connection: ConnectionId,
        raw_username: String,
        room_id: Option<String>,
    ) {
        let room = resolve_room(room_id.as_deref());
        let username = username::standardize(&raw_username);

        // Format is checked before uniqueness; each failure goes only to
        // the requester and leaves no state behind.
        if let Err(err) = username::validate(&username) {
            debug!("Join rejected for {}: {}", connection, err);
            self.peers.send_to(connection, err.into());
            return;
        }

        if self
            .registry
            .room(&room)
            .is_some_and(|r| r.has_member(&username))
        {
            debug!(
                "Join rejected for {}: '{}' already taken in '{}'",
                connection, username, room
            );
            self.peers.send_to(connection, JoinError::UsernameTaken.into());
            return;
        }

        let member = Member {
            connection,
            username: username.clone(),
        };
        if self.registry.ensure_room(&room).add_member(member).is_err() {
            self.peers.send_to(connection, JoinError::UsernameTaken.into());
            return;
        }

        self.peers.join_room(&room, connection);
        self.sessions.insert(
            connection,
            Session {
                username: username.clone(),
                room: room.clone(),
            },
        );

        // Snapshot before appending the join notice: the joiner receives
        // the history as it stood, then sees its own join via the live
        // broadcast. Per-connection channels are ordered, so delivering
        // the snapshot first keeps that sequence on the joiner's side.
        let history = self.registry.history(&room).to_vec();
        let record = self.system_record(format!("{} joined the chat", raw_username));
        self.registry.append_message(&room, record.clone());

        self.peers
            .send_to(connection, ServerEvent::ChatHistory { messages: history });
        self.broadcast_user_list(&room);
        self.peers
            .broadcast(&room, ServerEvent::SystemMessage { message: record });
        self.peers
            .send_to(connection, ServerEvent::JoinSuccess { room: room.clone() });

        info!(
            "Connection {} joined room '{}' as '{}'",
            connection, room, username
        );
    }

    /// Handle a chat message
    ///
    /// No session requirement here: the target room is whatever the event
    /// names, defaulting as usual. Incomplete payloads are dropped without
    /// a reply.
    fn handle_message(
        &mut self,
        connection: ConnectionId,
        message: Incoming,
        room_id: Option<String>,
    ) {
        let Incoming {
            username,
            body,
            timestamp,
        } = message;

        let Some(timestamp) = timestamp else {
            debug!("Dropping message without timestamp from {}", connection);
            return;
        };
        if username.is_empty() || body.is_empty() {
            debug!("Dropping incomplete message from {}", connection);
            return;
        }

        let room = resolve_room(room_id.as_deref());
        let record = MessageRecord::Chat {
            id: self.ids.next_id(),
            sender: username,
            body,
            timestamp,
            connection_id: connection.to_string(),
        };

        self.registry.append_message(&room, record.clone());
        self.peers
            .broadcast(&room, ServerEvent::ReceiveMessage { message: record });
    }

    /// Handle a typing indicator
    ///
    /// No-op without an active session or if the room does not exist.
    fn handle_typing(&mut self, connection: ConnectionId, room_id: Option<String>) {
        let Some(session) = self.sessions.get(&connection) else {
            return;
        };

        let room = resolve_room(room_id.as_deref());
        if self.registry.room(&room).is_none() {
            return;
        }

        self.peers.broadcast_except(
            &room,
            connection,
            ServerEvent::UserTyping {
                connection_id: connection.to_string(),
                username: session.username.clone(),
            },
        );
    }

    /// Handle an explicit leave
    ///
    /// No-op unless the connection's session holds a username that is
    /// currently a member of the resolved room.
    fn handle_leave(&mut self, connection: ConnectionId, room_id: Option<String>) {
        let room = resolve_room(room_id.as_deref());

        let Some(session) = self.sessions.get(&connection) else {
            return;
        };
        let username = session.username.clone();

        if !self
            .registry
            .room(&room)
            .is_some_and(|r| r.has_member(&username))
        {
            return;
        }

        // The leaver still hears the departure notice; removal from the
        // transport group happens afterwards.
        let record = self.system_record(format!("{} left the chat", username));
        self.registry.append_message(&room, record.clone());
        self.peers
            .broadcast(&room, ServerEvent::SystemMessage { message: record });

        self.registry.remove_member(&room, &username);
        self.sessions.remove(&connection);
        self.peers.leave_room(&room, connection);
        self.broadcast_user_list(&room);

        info!("Connection {} left room '{}'", connection, room);
    }

    /// Helper: broadcast the current member list to a room
    fn broadcast_user_list(&self, room: &str) {
        let users: Vec<String> = self
            .registry
            .list_members(room)
            .into_iter()
            .map(|m| m.username)
            .collect();

        self.peers.broadcast(
            room,
            ServerEvent::UserList {
                room: room.to_string(),
                users,
            },
        );
    }

    /// Helper: build a system record with a fresh id and server time
    fn system_record(&mut self, text: String) -> MessageRecord {
        MessageRecord::System {
            id: self.ids.next_id(),
            text,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DEFAULT_ROOM;
    use crate::types::SequentialIdSource;

    fn coordinator() -> Coordinator {
        let (_tx, rx) = mpsc::channel(8);
        Coordinator::with_id_source(rx, Box::new(SequentialIdSource::default()))
    }

    fn connect(c: &mut Coordinator) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let connection = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        c.handle_command(Command::Connect {
            connection,
            sender: tx,
        });
        (connection, rx)
    }

    fn join(c: &mut Coordinator, connection: ConnectionId, username: &str, room: Option<&str>) {
        c.handle_command(Command::Join {
            connection,
            username: username.to_string(),
            room_id: room.map(str::to_string),
        });
    }

    fn send_chat(c: &mut Coordinator, connection: ConnectionId, body: &str, room: Option<&str>) {
        c.handle_command(Command::Message {
            connection,
            message: Incoming {
                username: "alice123!".to_string(),
                body: body.to_string(),
                timestamp: Some(1_000),
            },
            room_id: room.map(str::to_string),
        });
    }

    fn check_room(c: &mut Coordinator, room: Option<&str>) -> bool {
        let (reply, mut rx) = oneshot::channel();
        c.handle_command(Command::CheckRoom {
            room_id: room.map(str::to_string),
            reply,
        });
        rx.try_recv().expect("check_room must reply synchronously")
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_join_success_event_sequence() {
        let mut c = coordinator();
        let (alice, mut rx) = connect(&mut c);

        join(&mut c, alice, "Alice123!", Some("team"));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 4);

        // History first, empty for a fresh room
        match &events[0] {
            ServerEvent::ChatHistory { messages } => assert!(messages.is_empty()),
            other => panic!("expected chat_history, got {:?}", other),
        }
        // Member list uses the standardized username
        match &events[1] {
            ServerEvent::UserList { room, users } => {
                assert_eq!(room, "team");
                assert_eq!(users, &["alice123!".to_string()]);
            }
            other => panic!("expected user_list, got {:?}", other),
        }
        // System message preserves the raw username for display
        match &events[2] {
            ServerEvent::SystemMessage {
                message: MessageRecord::System { text, .. },
            } => assert_eq!(text, "Alice123! joined the chat"),
            other => panic!("expected system_message, got {:?}", other),
        }
        match &events[3] {
            ServerEvent::JoinSuccess { room } => assert_eq!(room, "team"),
            other => panic!("expected join_success, got {:?}", other),
        }

        assert!(check_room(&mut c, Some("team")));
    }

    #[test]
    fn test_join_rejects_short_username() {
        let mut c = coordinator();
        let (conn, mut rx) = connect(&mut c);

        join(&mut c, conn, "bo1", Some("team"));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ServerEvent::JoinError { code, message } => {
                assert_eq!(*code, crate::message::JoinErrorCode::InvalidUsername);
                assert_eq!(message, "Username must be at least 5 characters long.");
            }
            other => panic!("expected join_error, got {:?}", other),
        }

        // Rejection leaves no state behind
        assert!(!check_room(&mut c, Some("team")));
    }

    #[test]
    fn test_format_reasons_in_order() {
        let mut c = coordinator();

        for (name, expected) in [
            ("a1!", "Username must be at least 5 characters long."),
            ("alice1!", "Username must contain at least 2 numbers."),
            ("alice123", "Username must contain at least 1 special character."),
        ] {
            let (conn, mut rx) = connect(&mut c);
            join(&mut c, conn, name, Some("team"));
            match drain(&mut rx).as_slice() {
                [ServerEvent::JoinError { message, .. }] => assert_eq!(message, expected),
                other => panic!("expected single join_error for {:?}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_duplicate_username_same_room_rejected() {
        let mut c = coordinator();
        let (alice, mut rx_alice) = connect(&mut c);
        join(&mut c, alice, "alice123!", Some("team"));
        drain(&mut rx_alice);

        // Standardization applies before the uniqueness check
        let (imposter, mut rx_imposter) = connect(&mut c);
        join(&mut c, imposter, "  ALICE123!  ", Some("team"));

        match drain(&mut rx_imposter).as_slice() {
            [ServerEvent::JoinError { code, .. }] => {
                assert_eq!(*code, crate::message::JoinErrorCode::UsernameTaken);
            }
            other => panic!("expected join_error, got {:?}", other),
        }
        // The original member saw nothing
        assert!(drain(&mut rx_alice).is_empty());
    }

    #[test]
    fn test_same_username_ok_across_rooms() {
        let mut c = coordinator();
        let (first, mut rx_first) = connect(&mut c);
        let (second, mut rx_second) = connect(&mut c);

        join(&mut c, first, "alice123!", Some("team"));
        join(&mut c, second, "alice123!", Some("other"));

        assert!(matches!(
            drain(&mut rx_first).last(),
            Some(ServerEvent::JoinSuccess { .. })
        ));
        assert!(matches!(
            drain(&mut rx_second).last(),
            Some(ServerEvent::JoinSuccess { .. })
        ));
        assert!(check_room(&mut c, Some("team")));
        assert!(check_room(&mut c, Some("other")));
    }

    #[test]
    fn test_history_replayed_in_order_without_own_join() {
        let mut c = coordinator();
        let (alice, mut rx_alice) = connect(&mut c);
        join(&mut c, alice, "alice123!", Some("team"));
        drain(&mut rx_alice);

        for body in ["one", "two", "three"] {
            send_chat(&mut c, alice, body, Some("team"));
        }
        drain(&mut rx_alice);

        let (bob, mut rx_bob) = connect(&mut c);
        join(&mut c, bob, "bob12#", Some("team"));

        let events = drain(&mut rx_bob);
        match &events[0] {
            ServerEvent::ChatHistory { messages } => {
                // Alice's join notice plus her three messages, as stored
                assert_eq!(messages.len(), 4);
                assert!(matches!(&messages[0], MessageRecord::System { text, .. }
                    if text == "alice123! joined the chat"));
                let bodies: Vec<&str> = messages[1..]
                    .iter()
                    .map(|m| match m {
                        MessageRecord::Chat { body, .. } => body.as_str(),
                        other => panic!("expected chat record, got {:?}", other),
                    })
                    .collect();
                assert_eq!(bodies, vec!["one", "two", "three"]);
            }
            other => panic!("expected chat_history first, got {:?}", other),
        }

        // Bob's own join notice arrives live, after the history
        assert!(events.iter().skip(1).any(|e| matches!(e,
            ServerEvent::SystemMessage { message: MessageRecord::System { text, .. } }
                if text == "bob12# joined the chat")));

        // Alice sees the refreshed list and the join notice
        let alice_events = drain(&mut rx_alice);
        assert!(alice_events.iter().any(|e| matches!(e,
            ServerEvent::UserList { users, .. }
                if users == &["alice123!".to_string(), "bob12#".to_string()])));
    }

    #[test]
    fn test_message_accepted_without_session() {
        // Any connection may inject a message into any existing room by
        // naming it; tightening this is a deliberate future decision.
        let mut c = coordinator();
        let (alice, mut rx_alice) = connect(&mut c);
        join(&mut c, alice, "alice123!", Some("team"));
        drain(&mut rx_alice);

        let (outsider, mut rx_outsider) = connect(&mut c);
        send_chat(&mut c, outsider, "injected", Some("team"));

        let events = drain(&mut rx_alice);
        assert!(events.iter().any(|e| matches!(e,
            ServerEvent::ReceiveMessage { message: MessageRecord::Chat { body, .. } }
                if body == "injected")));
        // The outsider is not in the room group, so it hears nothing
        assert!(drain(&mut rx_outsider).is_empty());

        // The injected message is in the history a later joiner receives
        let (bob, mut rx_bob) = connect(&mut c);
        join(&mut c, bob, "bob12#", Some("team"));
        match drain(&mut rx_bob).first() {
            Some(ServerEvent::ChatHistory { messages }) => {
                assert!(messages.iter().any(|m| matches!(m,
                    MessageRecord::Chat { body, .. } if body == "injected")));
            }
            other => panic!("expected chat_history, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_messages_dropped_silently() {
        let mut c = coordinator();
        let (alice, mut rx_alice) = connect(&mut c);
        join(&mut c, alice, "alice123!", Some("team"));
        drain(&mut rx_alice);

        for message in [
            Incoming {
                username: String::new(),
                body: "hi".to_string(),
                timestamp: Some(1),
            },
            Incoming {
                username: "alice123!".to_string(),
                body: String::new(),
                timestamp: Some(1),
            },
            Incoming {
                username: "alice123!".to_string(),
                body: "hi".to_string(),
                timestamp: None,
            },
        ] {
            c.handle_command(Command::Message {
                connection: alice,
                message,
                room_id: Some("team".to_string()),
            });
        }

        // No broadcast, no error back to the sender
        assert!(drain(&mut rx_alice).is_empty());
    }

    #[test]
    fn test_typing_broadcast_excludes_sender() {
        let mut c = coordinator();
        let (alice, mut rx_alice) = connect(&mut c);
        let (bob, mut rx_bob) = connect(&mut c);
        join(&mut c, alice, "alice123!", Some("team"));
        join(&mut c, bob, "bob12#", Some("team"));
        drain(&mut rx_alice);
        drain(&mut rx_bob);

        c.handle_command(Command::Typing {
            connection: alice,
            room_id: Some("team".to_string()),
        });

        assert!(drain(&mut rx_alice).is_empty());
        match drain(&mut rx_bob).as_slice() {
            [ServerEvent::UserTyping {
                connection_id,
                username,
            }] => {
                assert_eq!(connection_id, &alice.to_string());
                assert_eq!(username, "alice123!");
            }
            other => panic!("expected user_typing, got {:?}", other),
        }
    }

    #[test]
    fn test_typing_noop_without_session() {
        let mut c = coordinator();
        let (alice, mut rx_alice) = connect(&mut c);
        join(&mut c, alice, "alice123!", Some("team"));
        drain(&mut rx_alice);

        let (outsider, _rx) = connect(&mut c);
        c.handle_command(Command::Typing {
            connection: outsider,
            room_id: Some("team".to_string()),
        });

        assert!(drain(&mut rx_alice).is_empty());
    }

    #[test]
    fn test_leave_notifies_then_updates_list() {
        let mut c = coordinator();
        let (alice, mut rx_alice) = connect(&mut c);
        let (bob, mut rx_bob) = connect(&mut c);
        join(&mut c, alice, "alice123!", Some("team"));
        join(&mut c, bob, "bob12#", Some("team"));
        drain(&mut rx_alice);
        drain(&mut rx_bob);

        c.handle_command(Command::Leave {
            connection: bob,
            room_id: Some("team".to_string()),
        });

        // The leaver still hears the departure notice but not the
        // refreshed member list
        let bob_events = drain(&mut rx_bob);
        assert!(matches!(bob_events.as_slice(),
            [ServerEvent::SystemMessage { message: MessageRecord::System { text, .. } }]
                if text == "bob12# left the chat"));

        let alice_events = drain(&mut rx_alice);
        assert!(matches!(&alice_events[0],
            ServerEvent::SystemMessage { message: MessageRecord::System { text, .. } }
                if text == "bob12# left the chat"));
        assert!(matches!(&alice_events[1],
            ServerEvent::UserList { users, .. } if users == &["alice123!".to_string()]));
    }

    #[test]
    fn test_leave_noop_when_not_member_of_resolved_room() {
        let mut c = coordinator();
        let (alice, mut rx_alice) = connect(&mut c);
        join(&mut c, alice, "alice123!", Some("team"));
        drain(&mut rx_alice);

        // Session exists but the username is not a member of "other"
        c.handle_command(Command::Leave {
            connection: alice,
            room_id: Some("other".to_string()),
        });

        assert!(drain(&mut rx_alice).is_empty());
        assert!(check_room(&mut c, Some("team")));
    }

    #[test]
    fn test_empty_room_cleanup_and_fresh_history() {
        let mut c = coordinator();
        let (alice, mut rx_alice) = connect(&mut c);
        join(&mut c, alice, "alice123!", Some("team"));
        send_chat(&mut c, alice, "hello", Some("team"));
        drain(&mut rx_alice);

        c.handle_command(Command::Leave {
            connection: alice,
            room_id: Some("team".to_string()),
        });

        assert!(!check_room(&mut c, Some("team")));

        // Re-joining creates a fresh room with empty history
        let (bob, mut rx_bob) = connect(&mut c);
        join(&mut c, bob, "bob12#", Some("team"));
        match drain(&mut rx_bob).first() {
            Some(ServerEvent::ChatHistory { messages }) => assert!(messages.is_empty()),
            other => panic!("expected chat_history, got {:?}", other),
        }
    }

    #[test]
    fn test_default_room_survives_and_accepts_rejoin() {
        let mut c = coordinator();
        let (alice, mut rx_alice) = connect(&mut c);

        // Missing room id resolves to the default room
        join(&mut c, alice, "alice123!", None);
        assert!(matches!(
            drain(&mut rx_alice).last(),
            Some(ServerEvent::JoinSuccess { room }) if room == DEFAULT_ROOM
        ));
        assert!(check_room(&mut c, None));

        c.handle_command(Command::Leave {
            connection: alice,
            room_id: None,
        });

        // Not live once empty, yet still joinable
        assert!(!check_room(&mut c, None));
        let (bob, mut rx_bob) = connect(&mut c);
        join(&mut c, bob, "bob12#", None);
        assert!(matches!(
            drain(&mut rx_bob).last(),
            Some(ServerEvent::JoinSuccess { .. })
        ));
    }

    #[test]
    fn test_disconnect_notifies_only_others() {
        let mut c = coordinator();
        let (alice, mut rx_alice) = connect(&mut c);
        let (bob, mut rx_bob) = connect(&mut c);
        join(&mut c, alice, "alice123!", Some("team"));
        join(&mut c, bob, "bob12#", Some("team"));
        drain(&mut rx_alice);
        drain(&mut rx_bob);

        c.handle_command(Command::Disconnect { connection: bob });

        assert!(drain(&mut rx_bob).is_empty());
        let alice_events = drain(&mut rx_alice);
        assert!(matches!(&alice_events[0],
            ServerEvent::SystemMessage { message: MessageRecord::System { text, .. } }
                if text == "bob12# left the chat"));
        assert!(matches!(&alice_events[1],
            ServerEvent::UserList { users, .. } if users == &["alice123!".to_string()]));

        // A second disconnect for the same connection is a benign no-op
        c.handle_command(Command::Disconnect { connection: bob });
        assert!(drain(&mut rx_alice).is_empty());
    }

    #[test]
    fn test_disconnect_without_session_is_noop() {
        let mut c = coordinator();
        let (alice, mut rx_alice) = connect(&mut c);
        join(&mut c, alice, "alice123!", Some("team"));
        drain(&mut rx_alice);

        let (outsider, _rx) = connect(&mut c);
        c.handle_command(Command::Disconnect {
            connection: outsider,
        });

        assert!(drain(&mut rx_alice).is_empty());
        assert!(check_room(&mut c, Some("team")));
    }

    #[test]
    fn test_check_room_is_pure() {
        let mut c = coordinator();
        assert!(!check_room(&mut c, Some("ghost")));
        // Asking did not create the room
        assert!(!check_room(&mut c, Some("ghost")));
    }

    #[test]
    fn test_full_lifecycle_scenario() {
        let mut c = coordinator();

        let (alice, mut rx_alice) = connect(&mut c);
        join(&mut c, alice, "alice123!", Some("team"));
        assert!(matches!(
            drain(&mut rx_alice).last(),
            Some(ServerEvent::JoinSuccess { .. })
        ));
        assert!(check_room(&mut c, Some("team")));

        let (bo, mut rx_bo) = connect(&mut c);
        join(&mut c, bo, "bo1", Some("team"));
        assert!(matches!(drain(&mut rx_bo).as_slice(),
            [ServerEvent::JoinError { message, .. }]
                if message == "Username must be at least 5 characters long."));

        let (alice_again, mut rx_again) = connect(&mut c);
        join(&mut c, alice_again, "alice123!", Some("team"));
        assert!(matches!(drain(&mut rx_again).as_slice(),
            [ServerEvent::JoinError { code, .. }]
                if *code == crate::message::JoinErrorCode::UsernameTaken));

        c.handle_command(Command::Disconnect { connection: alice });
        assert!(!check_room(&mut c, Some("team")));

        let (back, mut rx_back) = connect(&mut c);
        join(&mut c, back, "alice123!", Some("team"));
        match drain(&mut rx_back).first() {
            Some(ServerEvent::ChatHistory { messages }) => assert!(messages.is_empty()),
            other => panic!("expected chat_history, got {:?}", other),
        }
    }
}
