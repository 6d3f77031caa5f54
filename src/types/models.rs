use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProjectRole, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub invited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// An account without a password hash has not accepted its invitation yet.
    #[must_use]
    pub fn is_activated(&self) -> bool {
        self.password_hash.is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: Project,
    pub video_count: i64,
    pub annotation_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMember {
    pub project_id: String,
    pub user_id: String,
    pub role: ProjectRole,
    pub created_at: DateTime<Utc>,
}

/// A membership row joined with the member's account details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDetail {
    pub user_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub role: ProjectRole,
    pub invited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub video_id: String,
    pub user_id: String,
    pub time_seconds: f64,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationWithAuthor {
    #[serde(flatten)]
    pub annotation: Annotation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// One annotation flattened for CSV export.
#[derive(Debug, Clone)]
pub struct ExportRow {
    pub video_title: String,
    pub time_seconds: f64,
    pub author: String,
    pub category: Option<String>,
    pub content: String,
    pub parent_id: Option<String>,
}

/// Result of the transactional part of an invitation.
#[derive(Debug, Clone)]
pub struct InviteOutcome {
    pub user: User,
    /// False when the user already was a member; their role is left as is.
    pub membership_created: bool,
}

/// Everything the store needs to activate an invited account in one go.
#[derive(Debug, Clone)]
pub struct Activation<'a> {
    pub email: &'a str,
    pub project_id: &'a str,
    pub role: ProjectRole,
    /// New credential for a placeholder account. `None` when the invitee
    /// already has one; it is then left untouched.
    pub password_hash: Option<&'a str>,
    pub display_name: Option<&'a str>,
    pub token_digest: &'a str,
}
