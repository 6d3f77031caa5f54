use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

/// GET /admin/projects, every project with its counts.
pub async fn list_projects(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let summaries = state
        .store
        .list_project_summaries(None)
        .api_err("Failed to list projects")?;
    Ok::<_, ApiError>(Json(ApiResponse::success(summaries)))
}
