use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::PaginationParams;
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreResultExt, paginate,
};

/// GET /admin/users, paginated by email.
pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);
    let cursor = params.cursor.as_deref().unwrap_or("");

    let users = state
        .store
        .list_users(cursor, limit + 1)
        .api_err("Failed to list users")?;

    let (users, next_cursor, has_more) = paginate(users, limit as usize, |u| u.email.clone());

    Ok::<_, ApiError>(Json(ApiResponse::success(PaginatedResponse::new(
        users,
        next_cursor,
        has_more,
    ))))
}
