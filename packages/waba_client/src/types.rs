//! Wire types for the WhatsApp Business API gateway.
//!
//! The gateway decorates Meta's own records with enrichment under a
//! `kapso` key. Unknown fields are preserved through `flatten` maps so
//! pass-through consumers do not lose data the types never modeled.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Generic `{ data: [...], paging: ... }` list envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_active_at: Option<String>,
    #[serde(default)]
    pub kapso: Option<KapsoConversationFields>,
}

/// Gateway enrichment on a conversation record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KapsoConversationFields {
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub messages_count: Option<i64>,
    #[serde(default)]
    pub last_message_type: Option<String>,
    #[serde(default)]
    pub last_message_text: Option<String>,
    #[serde(default)]
    pub last_inbound_at: Option<String>,
    #[serde(default)]
    pub last_outbound_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub text: Option<TextBody>,
    #[serde(default)]
    pub kapso: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub messages: Vec<MessageId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageId {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaUploadResponse {
    pub id: String,
}

/// A media object fetched through the gateway proxy.
#[derive(Debug, Clone)]
pub struct MediaDownload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub components: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Filters for [`WabaClient::list_conversations`](crate::WabaClient::list_conversations).
#[derive(Debug, Clone, Default)]
pub struct ConversationQuery {
    pub status: Option<String>,
    pub limit: Option<u32>,
    /// Comma-separated field list forwarded verbatim; selects which
    /// enrichment fields the gateway computes.
    pub fields: Option<String>,
}
