//! Multi-Room WebSocket Chat Relay Library
//!
//! A real-time chat relay built with tokio-tungstenite using the Actor
//! pattern for state management. Clients join named rooms, exchange
//! messages, see who is online, and receive the room's history on join.
//!
//! # Features
//! - Named rooms created on first join, deleted on last leave
//! - A permanent default room that outlives its members
//! - Per-room unique usernames (trimmed, case-folded)
//! - Ordered message history replayed to new joiners
//! - Presence (member list) and typing indicators
//! - Join/leave system messages, abrupt-disconnect handling
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Coordinator` is the central actor owning all state
//! - Each connection has a `handler` task communicating with the actor
//! - No locks needed - all state access goes through message passing
//! - Outbound fan-out is fire-and-forget over unbounded channels
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use chat_relay::{Coordinator, handle_connection};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(Coordinator::new(cmd_rx).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(stream, cmd_tx));
//!     }
//! }
//! ```

pub mod coordinator;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod transport;
pub mod types;
pub mod username;

// Re-export main types for convenience
pub use coordinator::{Command, Coordinator, Session};
pub use error::{AppError, JoinError};
pub use handler::handle_connection;
pub use message::{ClientEvent, Incoming, JoinErrorCode, MessageRecord, ServerEvent};
pub use registry::{Member, Room, RoomRegistry, DEFAULT_ROOM};
pub use transport::{Peer, PeerMap};
pub use types::{ConnectionId, IdSource, SequentialIdSource, UuidIdSource};
