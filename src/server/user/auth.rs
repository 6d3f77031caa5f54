use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{LoginRequest, LoginResponse, MeResponse};
use crate::server::response::{ApiError, ApiResponse};
use crate::service::credentials::verify_password;
use crate::service::validation::require_field;

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let email = require_field(Some(&req.email), "email")?;
    if req.password.is_empty() {
        return Err(ApiError::bad_request("Missing required fields: password"));
    }

    let user = verify_password(state.store.as_ref(), &state.passwords, email, &req.password)
        .inspect_err(|e| tracing::info!(%email, "Login rejected: {e}"))?;

    let token = state.tokens.issue_session(&user)?;
    let memberships = state.store.list_user_memberships(&user.id)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok::<_, ApiError>(Json(ApiResponse::success(LoginResponse {
        token,
        expires_in: state.tokens.session_ttl().num_seconds(),
        user,
        memberships,
    })))
}

/// GET /auth/me
pub async fn me(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let memberships = state.store.list_user_memberships(&user.id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(MeResponse { user, memberships })))
}
