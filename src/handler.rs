//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake, event
//! parsing, and bidirectional communication with the coordinator.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::coordinator::Command;
use crate::error::AppError;
use crate::message::{ClientEvent, ServerEvent};
use crate::types::ConnectionId;

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, sets up bidirectional communication,
/// and manages the connection lifecycle. The coordinator learns about the
/// connection via `Connect` and is always told about its end via
/// `Disconnect`, whichever task finishes first.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<Command>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Assign a connection identity
    let connection = ConnectionId::new();
    info!("Connection {} opened from {}", connection, peer_addr);

    // Channel for coordinator -> connection events
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Register with the coordinator
    if cmd_tx
        .send(Command::Connect {
            connection,
            sender: event_tx.clone(),
        })
        .await
        .is_err()
    {
        error!("Failed to register connection {} - coordinator closed", connection);
        return Err(AppError::ChannelSend);
    }

    // Clones for the read task
    let cmd_tx_read = cmd_tx.clone();
    let event_tx_read = event_tx.clone();

    // Spawn read task (WebSocket -> Command)
    let read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => {
                            if dispatch_event(connection, event, &cmd_tx_read, &event_tx_read)
                                .await
                                .is_err()
                            {
                                debug!("Coordinator closed, ending read task for {}", connection);
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Invalid JSON from {}: {}", connection, e);
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Connection {} sent close frame", connection);
                    break;
                }
                Ok(Message::Ping(data)) => {
                    debug!("Ping from {}", connection);
                    // Pong is handled automatically by tungstenite
                    let _ = data;
                }
                Ok(Message::Pong(_)) => {
                    debug!("Pong from {}", connection);
                }
                Ok(_) => {
                    // Binary or other message types - ignore
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", connection, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", connection);
    });

    // Spawn write task (ServerEvent -> WebSocket)
    let write_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize event: {}", e);
                    // Continue - don't break on serialization errors
                }
            }
        }
        debug!("Write task ended for connection");

        // Send close frame when done
        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete
    tokio::select! {
        _ = read_task => {
            debug!("Read task completed for {}", connection);
        }
        _ = write_task => {
            debug!("Write task completed for {}", connection);
        }
    }

    // Signal connection loss
    let _ = cmd_tx.send(Command::Disconnect { connection }).await;

    info!("Connection {} closed", connection);

    Ok(())
}

/// Forward a parsed client event to the coordinator
///
/// `check_room` is a request/response round trip: the reply arrives on a
/// oneshot and is emitted back to the client on its event channel. All
/// other events are one-way commands.
async fn dispatch_event(
    connection: ConnectionId,
    event: ClientEvent,
    cmd_tx: &mpsc::Sender<Command>,
    event_tx: &mpsc::UnboundedSender<ServerEvent>,
) -> Result<(), AppError> {
    let cmd = match event {
        ClientEvent::CheckRoom { room_id } => {
            let (reply, reply_rx) = oneshot::channel();
            cmd_tx
                .send(Command::CheckRoom { room_id, reply })
                .await
                .map_err(|_| AppError::ChannelSend)?;
            if let Ok(live) = reply_rx.await {
                let _ = event_tx.send(ServerEvent::RoomChecked { live });
            }
            return Ok(());
        }
        ClientEvent::JoinRoom { username, room_id } => Command::Join {
            connection,
            username,
            room_id,
        },
        ClientEvent::SendMessage { message, room_id } => Command::Message {
            connection,
            message,
            room_id,
        },
        ClientEvent::Typing { room_id } => Command::Typing {
            connection,
            room_id,
        },
        ClientEvent::LeaveRoom { room_id } => Command::Leave {
            connection,
            room_id,
        },
    };

    cmd_tx.send(cmd).await.map_err(|_| AppError::ChannelSend)
}
