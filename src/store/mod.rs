mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Operations that touch more than one entity run in a single transaction
/// and either fully apply or leave no trace.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>>;
    /// Returns the user for `email`, creating an invited placeholder if absent.
    fn ensure_user(&self, email: &str) -> Result<User>;
    /// Sets the credential and clears the invited flag. Fails with `NotFound`.
    fn set_user_password(
        &self,
        email: &str,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<User>;
    fn has_admin_user(&self) -> Result<bool>;

    // Project operations
    /// Inserts the project and its owner membership. Fails with
    /// `CodeCollision` if the code is already taken.
    fn create_project(&self, project: &Project, owner_id: &str) -> Result<()>;
    fn get_project(&self, id: &str) -> Result<Option<Project>>;
    fn get_project_by_code(&self, code: &str) -> Result<Option<Project>>;
    /// Lists projects with aggregate counts; `member_id` restricts the result
    /// to projects that user belongs to.
    fn list_project_summaries(&self, member_id: Option<&str>) -> Result<Vec<ProjectSummary>>;

    // Membership operations
    fn get_membership(&self, project_id: &str, user_id: &str) -> Result<Option<ProjectMember>>;
    fn list_members(&self, project_id: &str) -> Result<Vec<MemberDetail>>;
    fn list_user_memberships(&self, user_id: &str) -> Result<Vec<ProjectMember>>;
    fn list_member_emails(&self, project_id: &str) -> Result<Vec<String>>;
    /// Ensures the invitee exists (flagged invited) and inserts the
    /// membership if absent.
    fn invite_member(&self, project_id: &str, email: &str, role: ProjectRole)
    -> Result<InviteOutcome>;
    /// Activates the invitee's credential, re-asserts the membership and
    /// marks the token consumed. Fails with `InvitationUsed` on replay and
    /// with `InvalidCredentials` when a new credential is offered for an
    /// account that already has one.
    fn activate_invitation(&self, activation: &Activation<'_>) -> Result<User>;
    fn is_invitation_consumed(&self, token_digest: &str) -> Result<bool>;

    // Video operations
    fn create_video(&self, video: &Video) -> Result<()>;
    fn get_video(&self, id: &str) -> Result<Option<Video>>;
    fn list_project_videos(&self, project_id: &str) -> Result<Vec<Video>>;

    // Annotation operations
    fn create_annotation(&self, annotation: &Annotation) -> Result<()>;
    fn get_annotation(&self, id: &str) -> Result<Option<Annotation>>;
    fn list_video_annotations(&self, video_id: &str) -> Result<Vec<AnnotationWithAuthor>>;
    fn list_export_rows(&self, project_id: &str) -> Result<Vec<ExportRow>>;
}
