use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Project, ProjectRole, User};

/// Loads a project the user may read.
///
/// Global admins see every project. Everyone else needs a membership row.
/// Unknown projects fail with `NotFound` before membership is considered.
pub fn require_project_member(store: &dyn Store, user: &User, project_id: &str) -> Result<Project> {
    let project = store.get_project(project_id)?.ok_or(Error::NotFound)?;

    if user.is_admin() {
        return Ok(project);
    }

    match store.get_membership(project_id, &user.id)? {
        Some(_) => Ok(project),
        None => Err(Error::Forbidden),
    }
}

/// Like [`require_project_member`], but the member's role must also pass
/// `allowed`. Global admins bypass the role check.
pub fn require_project_role(
    store: &dyn Store,
    user: &User,
    project_id: &str,
    allowed: impl Fn(ProjectRole) -> bool,
) -> Result<Project> {
    let project = store.get_project(project_id)?.ok_or(Error::NotFound)?;

    if user.is_admin() {
        return Ok(project);
    }

    match store.get_membership(project_id, &user.id)? {
        Some(member) if allowed(member.role) => Ok(project),
        _ => Err(Error::Forbidden),
    }
}
