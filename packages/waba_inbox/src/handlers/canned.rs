use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;

use crate::AppState;

pub async fn list_canned_responses(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    match state.repository.list_canned_responses().await {
        Ok(responses) => Ok(Json(responses)),
        Err(e) => {
            error!("Failed to list canned responses: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Deserialize)]
pub struct CreateCannedRequest {
    shortcut: String,
    body: String,
}

pub async fn create_canned_response(
    State(state): State<AppState>,
    Json(req): Json<CreateCannedRequest>,
) -> Response {
    let shortcut = req.shortcut.trim();
    let body = req.body.trim();
    if shortcut.is_empty() || body.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "shortcut and body are required" })),
        )
            .into_response();
    }

    match state.repository.create_canned_response(shortcut, body).await {
        Ok(Some(response)) => Json(response).into_response(),
        Ok(None) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": format!("Shortcut '{}' is already taken", shortcut)
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to create canned response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateCannedRequest {
    shortcut: Option<String>,
    body: Option<String>,
}

pub async fn update_canned_response(
    State(state): State<AppState>,
    Path(canned_id): Path<String>,
    Json(req): Json<UpdateCannedRequest>,
) -> Response {
    match state
        .repository
        .update_canned_response(&canned_id, req.shortcut.as_deref(), req.body.as_deref())
        .await
    {
        Ok(Some(response)) => Json(response).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!("Failed to update canned response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn delete_canned_response(
    State(state): State<AppState>,
    Path(canned_id): Path<String>,
) -> StatusCode {
    match state.repository.delete_canned_response(&canned_id).await {
        Ok(true) => StatusCode::NO_CONTENT,
        Ok(false) => StatusCode::NOT_FOUND,
        Err(e) => {
            error!("Failed to delete canned response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
