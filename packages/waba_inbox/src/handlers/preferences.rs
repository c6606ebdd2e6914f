use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;

use crate::AppState;
use crate::handlers::agent_id_from_headers;

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": "No autorizado" })),
    )
        .into_response()
}

/// Per-agent notification preferences. Agents without a stored profile get
/// the defaults.
pub async fn get_preferences(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(agent_id) = agent_id_from_headers(&headers) else {
        return unauthorized();
    };

    match state.repository.get_user(&agent_id).await {
        Ok(Some(user)) => Json(serde_json::json!({
            "notifications_enabled": user.notifications_enabled,
            "role": user.role,
        }))
        .into_response(),
        Ok(None) => Json(serde_json::json!({
            "notifications_enabled": true,
            "role": "agent",
        }))
        .into_response(),
        Err(e) => {
            error!("Failed to load preferences: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct UpdatePreferencesRequest {
    notifications_enabled: bool,
}

pub async fn update_preferences(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdatePreferencesRequest>,
) -> Response {
    let Some(agent_id) = agent_id_from_headers(&headers) else {
        return unauthorized();
    };

    match state
        .repository
        .set_notifications_enabled(&agent_id, req.notifications_enabled)
        .await
    {
        Ok(Some(user)) => Json(serde_json::json!({
            "notifications_enabled": user.notifications_enabled,
        }))
        .into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!("Failed to update preferences: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
