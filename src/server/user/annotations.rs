use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::CreateAnnotationRequest;
use crate::server::response::{ApiError, ApiResponse};
use crate::service::annotations::{self, NewAnnotation};

/// POST /annotations
pub async fn create_annotation(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAnnotationRequest>,
) -> impl IntoResponse {
    let mut missing = Vec::new();
    if req.video_id.trim().is_empty() {
        missing.push("video_id");
    }
    if req.time_seconds.is_none() {
        missing.push("time_seconds");
    }
    if req.content.trim().is_empty() {
        missing.push("content");
    }
    if !missing.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let annotation = annotations::create(
        state.store.as_ref(),
        &state.notifier,
        &user,
        NewAnnotation {
            video_id: req.video_id.trim(),
            time_seconds: req.time_seconds.unwrap_or_default(),
            content: &req.content,
            category: req.category.as_deref(),
            parent_id: req.parent_id.as_deref(),
        },
    )?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(annotation))))
}
