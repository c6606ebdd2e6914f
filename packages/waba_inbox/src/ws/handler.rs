//! WebSocket Handler
//!
//! One sync engine per connection. The socket splits into a sender half fed
//! from an outgoing channel and a receiver half that forwards client messages
//! to the engine. Whichever task finishes first ends the connection, and the
//! engine is torn down with it.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use convo_sync::{EngineOptions, SyncEngine};

use crate::bus::ChangeBus;
use crate::source::InboxConversationSource;

use super::protocol::{ClientMessage, ServerMessage};

pub async fn handle_inbox_ws(
    socket: WebSocket,
    source: InboxConversationSource,
    bus: ChangeBus,
    poll_interval: Duration,
) {
    info!("New inbox WebSocket connection");

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Channel for sending messages to the WebSocket
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(100);

    let (engine, mut events) = SyncEngine::spawn(
        source,
        bus,
        EngineOptions {
            poll_interval,
            agent_id: None,
        },
    );

    // Forward engine events into the outgoing channel
    let tx_events = tx.clone();
    let event_task = async move {
        while let Some(event) = events.recv().await {
            if tx_events.send(ServerMessage::from(event)).await.is_err() {
                break;
            }
        }
    };

    // Serialize outgoing messages onto the socket. A failed send means the
    // client is gone; the message is dropped and the connection winds down.
    let sender_task = async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    warn!("Failed to serialize server message: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    };

    // Read client messages and hand them to the engine
    let engine_commands = &engine;
    let tx_input = tx.clone();
    let input_task = async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Ping) => {
                        if tx_input.send(ServerMessage::Pong).await.is_err() {
                            break;
                        }
                    }
                    Ok(msg) => {
                        if let Some(command) = msg.into_command() {
                            engine_commands.command(command);
                        }
                    }
                    Err(e) => {
                        warn!("Invalid client message: {}", e);
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("Client closed WebSocket");
                    break;
                }
                Err(e) => {
                    debug!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    };

    // Run all tasks
    tokio::select! {
        _ = event_task => debug!("Engine event task ended"),
        _ = sender_task => debug!("Sender task ended"),
        _ = input_task => debug!("Input task ended"),
    }

    engine.shutdown();
    info!("Inbox WebSocket connection closed");
}
