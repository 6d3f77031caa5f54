use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::CreateProjectRequest;
use crate::server::response::{ApiError, ApiResponse};
use crate::service::{access, annotations, projects, videos};

/// GET /projects
pub async fn list_projects(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let summaries = projects::list_projects(state.store.as_ref(), &user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(summaries)))
}

/// POST /projects
pub async fn create_project(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProjectRequest>,
) -> impl IntoResponse {
    let project = projects::create_project(
        state.store.as_ref(),
        &req.title,
        req.description.as_deref(),
        &user,
    )?;
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(project))))
}

/// GET /projects/code/{code}
///
/// Any signed-in user may resolve a code; the code is what members share.
pub async fn get_project_by_code(
    RequireUser(_user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    let project = projects::get_by_code(state.store.as_ref(), &code.to_ascii_uppercase())?;
    Ok::<_, ApiError>(Json(ApiResponse::success(project)))
}

/// GET /projects/{id}/members
pub async fn list_members(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    access::require_project_member(store, &user, &id)?;
    let members = projects::list_members(store, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(members)))
}

/// GET /projects/{id}/videos
pub async fn list_videos(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let videos = videos::list_for_project(state.store.as_ref(), &user, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(videos)))
}

/// GET /projects/{id}/export
pub async fn export_csv(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let csv = annotations::export_project_csv(state.store.as_ref(), &user, &id)?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"project-{}.csv\"",
        id.replace(|c: char| !c.is_ascii_alphanumeric() && c != '-', "")
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok::<_, ApiError>((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
