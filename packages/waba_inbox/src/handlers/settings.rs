use axum::{Json, extract::State, http::StatusCode, response::{IntoResponse, Response}};
use serde::Deserialize;
use tracing::error;

use crate::AppState;

pub async fn get_settings(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    match state.resolver.settings().await {
        Ok(settings) => Ok(Json(settings)),
        Err(e) => {
            error!("Failed to read settings: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateSettingsRequest {
    api_key: Option<String>,
    api_base_url: Option<String>,
    phone_number_id: Option<String>,
    waba_id: Option<String>,
}

/// Store provider credentials. Omitted fields are left alone; an empty
/// string clears the stored value back to the config-file fallback.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Response {
    let updates = [
        ("api_key", req.api_key),
        ("api_base_url", req.api_base_url),
        ("phone_number_id", req.phone_number_id),
        ("waba_id", req.waba_id),
    ];

    for (key, value) in updates {
        if let Some(value) = value {
            if let Err(e) = state.repository.set_setting(key, value.trim()).await {
                error!("Failed to store setting {}: {}", key, e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        }
    }

    match state.resolver.settings().await {
        Ok(settings) => Json(settings).into_response(),
        Err(e) => {
            error!("Failed to read settings back: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
