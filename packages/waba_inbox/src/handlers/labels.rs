use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;

use crate::AppState;

/// Color assigned when the caller does not pick one.
const DEFAULT_LABEL_COLOR: &str = "#64748b";

pub async fn list_labels(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    match state.repository.list_labels().await {
        Ok(labels) => Ok(Json(labels)),
        Err(e) => {
            error!("Failed to list labels: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Deserialize)]
pub struct CreateLabelRequest {
    name: String,
    color: Option<String>,
}

pub async fn create_label(
    State(state): State<AppState>,
    Json(req): Json<CreateLabelRequest>,
) -> Response {
    let name = req.name.trim();
    if name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Label name cannot be empty" })),
        )
            .into_response();
    }

    let color = req.color.as_deref().unwrap_or(DEFAULT_LABEL_COLOR);
    match state.repository.create_label(name, color).await {
        Ok(Some(label)) => Json(label).into_response(),
        Ok(None) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": format!("A label named '{}' already exists", name)
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to create label: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateLabelRequest {
    name: Option<String>,
    color: Option<String>,
}

pub async fn update_label(
    State(state): State<AppState>,
    Path(label_id): Path<String>,
    Json(req): Json<UpdateLabelRequest>,
) -> Response {
    match state
        .repository
        .update_label(&label_id, req.name.as_deref(), req.color.as_deref())
        .await
    {
        Ok(Some(label)) => Json(label).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!("Failed to update label: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn delete_label(
    State(state): State<AppState>,
    Path(label_id): Path<String>,
) -> StatusCode {
    match state.repository.delete_label(&label_id).await {
        Ok(true) => StatusCode::NO_CONTENT,
        Ok(false) => StatusCode::NOT_FOUND,
        Err(e) => {
            error!("Failed to delete label: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub async fn get_contact_labels(
    State(state): State<AppState>,
    Path(phone_number): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    match state.repository.labels_for_contact(&phone_number).await {
        Ok(labels) => Ok(Json(labels)),
        Err(e) => {
            error!("Failed to list contact labels: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Deserialize)]
pub struct SetContactLabelsRequest {
    label_ids: Vec<String>,
}

/// Replace the full label set of a contact.
pub async fn set_contact_labels(
    State(state): State<AppState>,
    Path(phone_number): Path<String>,
    Json(req): Json<SetContactLabelsRequest>,
) -> Response {
    for label_id in &req.label_ids {
        match state.repository.get_label(label_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({
                        "error": format!("Unknown label id: {}", label_id)
                    })),
                )
                    .into_response();
            }
            Err(e) => {
                error!("Failed to look up label: {}", e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }

    match state
        .repository
        .set_contact_labels(&phone_number, &req.label_ids)
        .await
    {
        Ok(labels) => Json(labels).into_response(),
        Err(e) => {
            error!("Failed to set contact labels: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
