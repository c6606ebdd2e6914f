use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::AppState;

/// Health check endpoint - returns server status
pub async fn health_handler(State(state): State<AppState>) -> Response {
    let db_ok = state.db.pool.acquire().await.is_ok();

    if db_ok {
        Json(serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "database": "connected"
        }))
        .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "degraded",
                "version": env!("CARGO_PKG_VERSION"),
                "database": "disconnected"
            })),
        )
            .into_response()
    }
}
