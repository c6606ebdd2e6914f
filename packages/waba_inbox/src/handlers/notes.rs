use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;

use crate::AppState;
use crate::handlers::agent_id_from_headers;

pub async fn get_conversation_notes(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    match state
        .repository
        .notes_for_conversation(&conversation_id)
        .await
    {
        Ok(notes) => Ok(Json(notes)),
        Err(e) => {
            error!("Failed to list notes: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Deserialize)]
pub struct CreateNoteRequest {
    body: String,
}

/// Attach an internal note. The author comes from the `x-agent-id` header
/// when the UI sends one.
pub async fn create_conversation_note(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateNoteRequest>,
) -> Response {
    let body = req.body.trim();
    if body.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Note body cannot be empty" })),
        )
            .into_response();
    }

    let agent_id = agent_id_from_headers(&headers);
    match state
        .repository
        .insert_note(&conversation_id, agent_id.as_deref(), body)
        .await
    {
        Ok(note) => Json(note).into_response(),
        Err(e) => {
            error!("Failed to create note: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
