use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{AcceptInviteRequest, InviteRequest, MeResponse, ValidateInviteParams};
use crate::server::response::{ApiError, ApiResponse};

/// POST /projects/{id}/invitations
pub async fn invite(
    RequireUser(inviter): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<InviteRequest>,
) -> impl IntoResponse {
    let result = state
        .invitations()
        .invite(&id, &req.email, req.role.as_deref(), &inviter)?;
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(result))))
}

/// GET /invitations/validate?token=
pub async fn validate(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ValidateInviteParams>,
) -> impl IntoResponse {
    let claims = state.invitations().validate(&params.token)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(claims)))
}

/// POST /invitations/accept
pub async fn accept(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AcceptInviteRequest>,
) -> impl IntoResponse {
    let user = state
        .invitations()
        .accept(&req.token, &req.password, req.display_name.as_deref())?;
    let memberships = state.store.list_user_memberships(&user.id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(MeResponse { user, memberships })))
}
