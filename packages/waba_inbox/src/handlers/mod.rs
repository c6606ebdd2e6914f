pub mod admin;
pub mod canned;
pub mod contacts;
pub mod conversations;
pub mod health;
pub mod labels;
pub mod messages;
pub mod notes;
pub mod preferences;
pub mod settings;
pub mod sounds;
pub mod websocket;

// Re-export all handlers for easy route registration
pub use admin::{create_user, get_analytics, get_database_stats, list_users, update_user};
pub use canned::{
    create_canned_response, delete_canned_response, list_canned_responses, update_canned_response,
};
pub use contacts::update_contact;
pub use conversations::{
    assign_conversation, get_conversation_messages, list_conversations, update_conversation_status,
};
pub use health::health_handler;
pub use labels::{
    create_label, delete_label, get_contact_labels, list_labels, set_contact_labels, update_label,
};
pub use messages::{get_media, list_templates, send_message, send_template};
pub use notes::{create_conversation_note, get_conversation_notes};
pub use preferences::{get_preferences, update_preferences};
pub use settings::{get_settings, update_settings};
pub use sounds::get_sound;
pub use websocket::websocket_handler;

use axum::http::HeaderMap;

/// Agent identity carried on requests from the UI. Absent for anonymous use.
pub(crate) fn agent_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-agent-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
