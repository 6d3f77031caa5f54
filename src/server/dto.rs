use serde::{Deserialize, Serialize};

use crate::types::{ProjectMember, User};

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub cursor: Option<String>,
    pub limit: Option<i32>,
}

// Auth

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    /// Seconds until the session token expires.
    pub expires_in: i64,
    pub user: User,
    pub memberships: Vec<ProjectMember>,
}

/// Returned by `/auth/me` and by invitation acceptance.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub memberships: Vec<ProjectMember>,
}

// Projects

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
}

// Invitations

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    #[serde(default)]
    pub email: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateInviteParams {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInviteRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
    pub display_name: Option<String>,
}

// Annotations

#[derive(Debug, Deserialize)]
pub struct CreateAnnotationRequest {
    #[serde(default)]
    pub video_id: String,
    pub time_seconds: Option<f64>,
    #[serde(default)]
    pub content: String,
    pub category: Option<String>,
    pub parent_id: Option<String>,
}
