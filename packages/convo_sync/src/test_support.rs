//! Shared fixtures for the unit tests in this crate.

use std::sync::{Arc, Mutex};

use crate::alerts::{AlertSink, DesktopNotification};
use crate::chime::ChimeSound;
use crate::model::{Conversation, Direction, LastMessage};

#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    chimes: Arc<Mutex<Vec<ChimeSound>>>,
    notifications: Arc<Mutex<Vec<DesktopNotification>>>,
}

impl RecordingSink {
    pub(crate) fn chimes(&self) -> Vec<ChimeSound> {
        self.chimes.lock().unwrap().clone()
    }

    pub(crate) fn notifications(&self) -> Vec<DesktopNotification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl AlertSink for RecordingSink {
    fn play_chime(&self, sound: ChimeSound) {
        self.chimes.lock().unwrap().push(sound);
    }

    fn notify(&self, notification: DesktopNotification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

pub(crate) fn conversation(id: &str, ts: &str, last_message: Option<LastMessage>) -> Conversation {
    Conversation {
        id: id.to_string(),
        phone_number: format!("52155500{id}"),
        contact_name: None,
        last_message,
        last_active_at: (!ts.is_empty()).then(|| ts.to_string()),
        provider_status: Some("active".to_string()),
        status: "abierto".to_string(),
        assigned_agent_id: None,
        assigned_agent_name: None,
        labels: Vec::new(),
        messages_count: None,
    }
}

pub(crate) fn inbound(id: &str, ts: &str) -> Conversation {
    conversation(
        id,
        ts,
        Some(LastMessage {
            content: "hola, tengo una duda".to_string(),
            direction: Direction::Inbound,
            kind: Some("text".to_string()),
        }),
    )
}

pub(crate) fn outbound(id: &str, ts: &str, content: &str) -> Conversation {
    conversation(
        id,
        ts,
        Some(LastMessage {
            content: content.to_string(),
            direction: Direction::Outbound,
            kind: Some("text".to_string()),
        }),
    )
}
