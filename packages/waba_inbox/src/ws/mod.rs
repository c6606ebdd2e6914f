//! Inbox Sync WebSocket
//!
//! One WebSocket connection per browser tab. Each connection owns a
//! [`convo_sync::SyncEngine`] and relays its events as JSON messages; client
//! messages steer the engine.

mod handler;
mod protocol;

pub use handler::handle_inbox_ws;
pub use protocol::{ClientMessage, ServerMessage};
