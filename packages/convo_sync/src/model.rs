//! Conversation snapshot types shared by the sync engine and its transports.

use serde::{Deserialize, Serialize};

/// Direction of the most recent message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Preview of the newest message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub direction: Direction,
    /// Provider message type ("text", "image", ...). Not inspected here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Label attached to a contact, carried on every conversation row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRef {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// One row of the conversation list snapshot.
///
/// `status` is the local workflow status (abierto, pendiente, resuelto) while
/// `provider_status` is the upstream conversation lifecycle value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent_name: Option<String>,
    #[serde(default)]
    pub labels: Vec<LabelRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages_count: Option<i64>,
}

impl Conversation {
    /// Freshness timestamp used for novelty detection. Missing timestamps
    /// normalize to the empty string.
    pub fn freshness(&self) -> &str {
        self.last_active_at.as_deref().unwrap_or("")
    }

    /// Name shown in alerts: contact name, then phone number, then a generic
    /// fallback.
    pub fn display_name(&self) -> &str {
        match self.contact_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ if !self.phone_number.is_empty() => &self.phone_number,
            _ => "Cliente",
        }
    }
}

/// Whether `next` differs from `prev` in a way the UI must see.
///
/// Compares length, then per-index id, freshness timestamp, workflow status
/// and assignment. Message content and label edits alone do not count.
pub fn meaningful_change(prev: &[Conversation], next: &[Conversation]) -> bool {
    if prev.len() != next.len() {
        return true;
    }
    prev.iter().zip(next.iter()).any(|(a, b)| {
        a.id != b.id
            || a.freshness() != b.freshness()
            || a.status != b.status
            || a.assigned_agent_id != b.assigned_agent_id
    })
}
