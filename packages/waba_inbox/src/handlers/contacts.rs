use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;

use crate::AppState;

#[derive(Deserialize)]
pub struct UpdateContactRequest {
    display_name: String,
}

/// Rename a contact. The name overrides whatever the provider reports in
/// every list the server hands out afterwards.
pub async fn update_contact(
    State(state): State<AppState>,
    Path(phone_number): Path<String>,
    Json(req): Json<UpdateContactRequest>,
) -> Response {
    let display_name = req.display_name.trim();
    if display_name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "display_name cannot be empty" })),
        )
            .into_response();
    }

    match state
        .repository
        .upsert_contact(&phone_number, display_name)
        .await
    {
        Ok(contact) => Json(contact).into_response(),
        Err(e) => {
            error!("Failed to update contact: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, routing::patch};
    use tower::ServiceExt;

    async fn test_router() -> (Router, tempfile::TempDir) {
        let (state, tmp) = crate::test_helpers::test_app_state().await;
        let router = Router::new()
            .route("/api/contacts/{phone}", patch(update_contact))
            .with_state(state);
        (router, tmp)
    }

    #[tokio::test]
    async fn test_update_contact_upserts_and_renames() {
        let (app, _tmp) = test_router().await;

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/api/contacts/5215550001")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"display_name":"Ana Torres"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let contact: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(contact["phone_number"], "5215550001");
        assert_eq!(contact["display_name"], "Ana Torres");

        let resp = app
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/api/contacts/5215550001")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"display_name":"  Ana T.  "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let contact: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(contact["display_name"], "Ana T.");
    }

    #[tokio::test]
    async fn test_update_contact_rejects_blank_names() {
        let (app, _tmp) = test_router().await;
        let resp = app
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/api/contacts/5215550001")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"display_name":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
