use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};

use crate::AppState;
use crate::ws;

/// Upgrade to the live sync WebSocket. Each connection runs its own engine.
pub async fn websocket_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let source = state.source.clone();
    let bus = state.bus.clone();
    let poll_interval = state.poll_interval;
    ws.on_upgrade(move |socket| ws::handle_inbox_ws(socket, source, bus, poll_interval))
}
