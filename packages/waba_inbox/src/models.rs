use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Workflow statuses a conversation can be moved through.
pub const CONVERSATION_STATUSES: [&str; 3] = ["abierto", "pendiente", "resuelto"];

pub fn is_valid_status(status: &str) -> bool {
    CONVERSATION_STATUSES.contains(&status)
}

/// Locally tracked workflow state for one provider conversation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ConversationMeta {
    pub conversation_id: String,
    pub status: String,
    pub assigned_agent_id: Option<String>,
    pub updated_at: i64,
}

/// A label agents can attach to contacts.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContactLabel {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_at: i64,
}

impl ContactLabel {
    pub fn new(name: String, color: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            color,
            created_at: Utc::now().timestamp(),
        }
    }
}

/// Locally stored display name for a phone number.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Contact {
    pub phone_number: String,
    pub display_name: String,
    pub updated_at: i64,
}

/// Internal note on a conversation. Insert-only.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ConversationNote {
    pub id: String,
    pub conversation_id: String,
    pub agent_id: Option<String>,
    pub body: String,
    pub created_at: i64,
}

impl ConversationNote {
    pub fn new(conversation_id: String, agent_id: Option<String>, body: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id,
            agent_id,
            body,
            created_at: Utc::now().timestamp(),
        }
    }
}

/// Agent or admin profile.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub role: String,
    pub notifications_enabled: bool,
    pub created_at: i64,
}

impl UserProfile {
    pub fn new(display_name: String, role: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            display_name,
            role,
            notifications_enabled: true,
            created_at: Utc::now().timestamp(),
        }
    }
}

/// Saved reply inserted into the composer via its shortcut.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CannedResponse {
    pub id: String,
    pub shortcut: String,
    pub body: String,
    pub created_at: i64,
}

impl CannedResponse {
    pub fn new(shortcut: String, body: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            shortcut,
            body,
            created_at: Utc::now().timestamp(),
        }
    }
}

/// Aggregated counts for the admin analytics view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub total_tracked: i64,
    pub by_status: Vec<StatusCount>,
    pub by_agent: Vec<AgentCount>,
    pub by_label: Vec<LabelCount>,
    pub notes_count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AgentCount {
    pub agent_id: Option<String>,
    pub agent_name: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LabelCount {
    pub label_id: String,
    pub label_name: String,
    pub count: i64,
}
