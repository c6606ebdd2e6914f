//! WebSocket Protocol Types
//!
//! JSON messages exchanged between the browser inbox and its per-connection
//! sync engine. Client messages translate into [`EngineCommand`]s, except for
//! `Ping`, which the transport answers itself.

use serde::{Deserialize, Serialize};

use convo_sync::{ChimeSound, Conversation, EngineCommand, EngineEvent, SyncStatus};

// === Client -> Server Messages ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Introduce the connection, optionally naming the signed-in agent.
    Hello {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent_id: Option<String>,
    },
    /// The tab was hidden or became visible again.
    Visibility { hidden: bool },
    /// The browser granted or revoked notification permission.
    NotificationPermission { granted: bool },
    /// The agent toggled sounds and notifications in their preferences.
    NotificationsEnabled { enabled: bool },
    /// The agent just sent an outbound message.
    MarkSent,
    /// Stop alerting for one handoff conversation.
    AcknowledgeHandoff { conversation_id: String },
    /// Reload the snapshot regardless of the diff gate.
    Refresh,
    /// Keepalive probe, answered with [`ServerMessage::Pong`].
    Ping,
}

impl ClientMessage {
    /// Engine command equivalent, if any. `Ping` never reaches the engine.
    pub fn into_command(self) -> Option<EngineCommand> {
        match self {
            ClientMessage::Hello { agent_id } => Some(EngineCommand::Hello { agent_id }),
            ClientMessage::Visibility { hidden } => Some(EngineCommand::Visibility { hidden }),
            ClientMessage::NotificationPermission { granted } => {
                Some(EngineCommand::NotificationPermission { granted })
            }
            ClientMessage::NotificationsEnabled { enabled } => {
                Some(EngineCommand::NotificationsEnabled { enabled })
            }
            ClientMessage::MarkSent => Some(EngineCommand::MarkSent),
            ClientMessage::AcknowledgeHandoff { conversation_id } => {
                Some(EngineCommand::AcknowledgeHandoff { conversation_id })
            }
            ClientMessage::Refresh => Some(EngineCommand::Refresh),
            ClientMessage::Ping => None,
        }
    }
}

// === Server -> Client Messages ===

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Full conversation list replacing whatever the client holds.
    Snapshot { conversations: Vec<Conversation> },
    /// Engine liveness flags for the status strip.
    SyncStatus {
        is_polling: bool,
        is_paused: bool,
        realtime_connected: bool,
    },
    /// Current handoff roster plus the subset still demanding attention.
    Handoffs {
        all_handoff_ids: Vec<String>,
        alerting_ids: Vec<String>,
    },
    /// Play one of the bundled chimes.
    PlaySound { sound: ChimeSound },
    /// Desktop notification for the page to raise.
    Notification {
        tag: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
        icon: String,
    },
    /// Keepalive response.
    Pong,
}

impl From<EngineEvent> for ServerMessage {
    fn from(event: EngineEvent) -> Self {
        match event {
            EngineEvent::Snapshot(conversations) => ServerMessage::Snapshot {
                conversations: conversations.as_ref().clone(),
            },
            EngineEvent::Handoffs {
                all_handoff_ids,
                alerting_ids,
            } => ServerMessage::Handoffs {
                all_handoff_ids,
                alerting_ids,
            },
            EngineEvent::Status(SyncStatus {
                is_polling,
                is_paused,
                realtime_connected,
            }) => ServerMessage::SyncStatus {
                is_polling,
                is_paused,
                realtime_connected,
            },
            EngineEvent::Chime(sound) => ServerMessage::PlaySound { sound },
            EngineEvent::Notification(notification) => ServerMessage::Notification {
                tag: notification.tag,
                title: notification.title,
                body: notification.body,
                icon: notification.icon,
            },
        }
    }
}
