use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::error;

use crate::AppState;
use crate::models::AnalyticsReport;

const USER_ROLES: [&str; 2] = ["agent", "admin"];

#[derive(Deserialize)]
pub struct AnalyticsQuery {
    format: Option<String>,
}

/// Workload report over everything agents have touched. `?format=csv`
/// downloads the per-agent rows for the spreadsheet crowd.
pub async fn get_analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Response {
    let report = match state.repository.analytics_report().await {
        Ok(report) => report,
        Err(e) => {
            error!("Failed to build analytics report: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match query.format.as_deref() {
        Some("csv") => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"analytics.csv\"",
                ),
            ],
            agents_csv(&report),
        )
            .into_response(),
        _ => Json(report).into_response(),
    }
}

fn agents_csv(report: &AnalyticsReport) -> String {
    let mut out = String::from("agent_id,agent_name,count\r\n");
    for row in &report.by_agent {
        out.push_str(&csv_escape(row.agent_id.as_deref().unwrap_or("")));
        out.push(',');
        out.push_str(&csv_escape(row.agent_name.as_deref().unwrap_or("")));
        out.push(',');
        out.push_str(&row.count.to_string());
        out.push_str("\r\n");
    }
    out
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    match state.repository.list_users().await {
        Ok(users) => Ok(Json(users)),
        Err(e) => {
            error!("Failed to list users: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    display_name: String,
    role: Option<String>,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Response {
    let display_name = req.display_name.trim();
    if display_name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "display_name cannot be empty" })),
        )
            .into_response();
    }

    let role = req.role.as_deref().unwrap_or("agent");
    if !USER_ROLES.contains(&role) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!("Unknown role '{}', expected one of: {}", role, USER_ROLES.join(", "))
            })),
        )
            .into_response();
    }

    match state.repository.create_user(display_name, role).await {
        Ok(user) => Json(user).into_response(),
        Err(e) => {
            error!("Failed to create user: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    display_name: Option<String>,
    role: Option<String>,
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Response {
    if let Some(role) = req.role.as_deref() {
        if !USER_ROLES.contains(&role) {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": format!("Unknown role '{}', expected one of: {}", role, USER_ROLES.join(", "))
                })),
            )
                .into_response();
        }
    }

    match state
        .repository
        .update_user(&user_id, req.display_name.as_deref(), req.role.as_deref())
        .await
    {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!("Failed to update user: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn get_database_stats(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    match state.db.get_stats().await {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => {
            error!("Failed to collect database stats: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
