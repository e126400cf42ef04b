//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::ProjectId,
    infrastructure::dto::http::{PresenceDetailDto, PresenceListDto, StatusSummaryDto},
    ui::state::AppState,
    usecase::PresenceError,
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Operational summary: users, projects, rooms and dropped messages
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusSummaryDto> {
    let summary = state.service.get_status_summary.execute().await;
    Json(summary.into())
}

/// Who is online in a project
pub async fn get_project_presence(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> Result<Json<PresenceListDto>, StatusCode> {
    let project_id = ProjectId::new(project_id).map_err(|_| StatusCode::BAD_REQUEST)?;

    match state.service.get_presence.list_members(&project_id).await {
        Ok(records) => Ok(Json(PresenceListDto {
            project_id: project_id.to_string(),
            users: records.iter().map(PresenceDetailDto::from).collect(),
        })),
        Err(PresenceError::NotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to list presence for '{}': {}", project_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
