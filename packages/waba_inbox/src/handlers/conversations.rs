use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::AppState;
use crate::models::{CONVERSATION_STATUSES, is_valid_status};

#[derive(Deserialize)]
pub struct ListQuery {
    status: Option<String>,
    limit: Option<u32>,
}

/// Provider conversation list merged with local workflow data. The `status`
/// filter is the provider's, not the local workflow status.
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    match state
        .source
        .fetch_merged(query.status.as_deref(), query.limit)
        .await
    {
        Ok(conversations) => Ok(Json(conversations)),
        Err(e) => {
            error!("Failed to list conversations: {:#}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Deserialize)]
pub struct MessagesQuery {
    limit: Option<u32>,
}

/// Message history straight from the provider, paging envelope included.
pub async fn get_conversation_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let result = async {
        let client = state.resolver.client().await?;
        let phone_number_id = state.resolver.phone_number_id().await?;
        let page = client
            .list_messages(&phone_number_id, &conversation_id, query.limit)
            .await?;
        anyhow::Ok(page)
    }
    .await;

    match result {
        Ok(page) => Ok(Json(page)),
        Err(e) => {
            error!(
                "Failed to fetch messages for {}: {:#}",
                conversation_id, e
            );
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    status: String,
}

/// Set the workflow status, creating the tracking row on first touch.
pub async fn update_conversation_status(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Response {
    if !is_valid_status(&req.status) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!(
                    "Unknown status '{}', expected one of: {}",
                    req.status,
                    CONVERSATION_STATUSES.join(", ")
                )
            })),
        )
            .into_response();
    }

    match state
        .repository
        .set_conversation_status(&conversation_id, &req.status)
        .await
    {
        Ok(meta) => Json(meta).into_response(),
        Err(e) => {
            error!("Failed to update conversation status: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct AssignRequest {
    agent_id: Option<String>,
}

/// Assign the conversation to an agent, or unassign with `null`.
pub async fn assign_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(req): Json<AssignRequest>,
) -> Response {
    if let Some(agent_id) = &req.agent_id {
        if Uuid::parse_str(agent_id).is_err() {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "agent_id must be a UUID or null" })),
            )
                .into_response();
        }
    }

    match state
        .repository
        .set_conversation_assignment(&conversation_id, req.agent_id.as_deref())
        .await
    {
        Ok(meta) => Json(meta).into_response(),
        Err(e) => {
            error!("Failed to assign conversation: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
