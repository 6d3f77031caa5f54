//! Invitation workflow.
//!
//! A (project, email) pair moves from non-member to invited when
//! [`InvitationWorkflow::invite`] creates the placeholder account and the
//! membership row. It becomes an active member when
//! [`InvitationWorkflow::accept`] sets the password. An invitee who already
//! has a password joins by presenting it; an invitation never replaces an
//! existing credential. The membership role is fixed by whichever insert
//! lands first; later invites never change it.

use serde::Serialize;

use super::access::require_project_role;
use super::validation::{require_field, validate_email};
use crate::auth::{
    InvitationClaims, PasswordHasher, TokenService, token_digest, validate_password_strength,
};
use crate::error::{Error, Result};
use crate::notify::Notifier;
use crate::store::Store;
use crate::types::{Activation, ProjectRole, User};

/// What the inviter gets back.
///
/// When the invitation was mailed, the link and token go to the invitee only.
/// Without mail the inviter receives them to pass on.
#[derive(Debug, Clone, Serialize)]
pub struct InviteResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub mailed: bool,
    pub email: String,
    pub project_id: String,
    pub role: ProjectRole,
    pub membership_created: bool,
}

pub struct InvitationWorkflow<'a> {
    pub store: &'a dyn Store,
    pub tokens: &'a TokenService,
    pub passwords: &'a PasswordHasher,
    pub notifier: &'a Notifier,
    pub public_base_url: &'a str,
}

impl InvitationWorkflow<'_> {
    /// Invites `email` into a project.
    ///
    /// `role` defaults to `annotator`. Only `admin` and `annotator` can be
    /// granted; `owner` belongs to the creator.
    pub fn invite(
        &self,
        project_id: &str,
        email: &str,
        role: Option<&str>,
        inviter: &User,
    ) -> Result<InviteResult> {
        let email = email.trim();
        validate_email(email)?;
        let role = parse_invite_role(role)?;

        let project = require_project_role(self.store, inviter, project_id, ProjectRole::can_invite)?;

        let outcome = self.store.invite_member(&project.id, email, role)?;
        if !outcome.membership_created {
            tracing::debug!(project_id = %project.id, %email, "Already a member, role unchanged");
        }

        let claims = InvitationClaims {
            email: email.to_string(),
            project_id: project.id.clone(),
            role,
        };
        let token = self.tokens.issue_invitation(&claims)?;
        let invite_link = self.invite_link(&token);

        tracing::info!(project_id = %project.id, %email, %role, inviter = %inviter.id, "Invitation issued");

        let inviter_name = inviter.display_name.as_deref().unwrap_or(&inviter.email);
        let mailed = self.notifier.dispatch(
            vec![email.to_string()],
            format!("Invitation to join \"{}\"", project.title),
            format!(
                "{inviter_name} invited you to collaborate on \"{}\" as {role}.\n\n\
                 Accept the invitation within 48 hours:\n{invite_link}\n",
                project.title
            ),
        );
        let mailed = mailed.is_some();

        let (invite_link, token) = if mailed {
            (None, None)
        } else {
            (Some(invite_link), Some(token))
        };

        Ok(InviteResult {
            invite_link,
            token,
            mailed,
            email: email.to_string(),
            project_id: project.id,
            role,
            membership_created: outcome.membership_created,
        })
    }

    /// Decodes an invitation without side effects, for prefilling the
    /// acceptance form.
    pub fn validate(&self, token: &str) -> Result<InvitationClaims> {
        let token = require_field(Some(token), "token")?;
        let claims = self.tokens.verify_invitation(token)?;

        if self.store.is_invitation_consumed(&token_digest(token))? {
            return Err(Error::InvitationUsed);
        }
        Ok(claims)
    }

    /// Activates the invitee's account and confirms the membership.
    ///
    /// A placeholder account takes `password` as its new credential. An
    /// account that already has one must present it and keeps it, along with
    /// its display name. The credential, the membership and the consumed
    /// marker are written in one transaction. A second acceptance of the same
    /// token fails with `InvitationUsed`.
    pub fn accept(&self, token: &str, password: &str, display_name: Option<&str>) -> Result<User> {
        let token = require_field(Some(token), "token")?;
        if password.is_empty() {
            return Err(Error::MissingFields("password".to_string()));
        }

        let claims = self.tokens.verify_invitation(token)?;
        let digest = token_digest(token);
        if self.store.is_invitation_consumed(&digest)? {
            return Err(Error::InvitationUsed);
        }

        let current_hash = self
            .store
            .get_user_by_email(&claims.email)?
            .and_then(|user| user.password_hash);

        let (password_hash, display_name) = match current_hash {
            Some(current) => {
                if !self.passwords.verify(password, &current)? {
                    tracing::warn!(email = %claims.email, project_id = %claims.project_id,
                        "Invitation for an active account presented a wrong password");
                    return Err(Error::InvalidCredentials);
                }
                (None, None)
            }
            None => {
                validate_password_strength(password)?;
                (
                    Some(self.passwords.hash(password)?),
                    display_name.map(str::trim).filter(|n| !n.is_empty()),
                )
            }
        };

        let user = self.store.activate_invitation(&Activation {
            email: &claims.email,
            project_id: &claims.project_id,
            role: claims.role,
            password_hash: password_hash.as_deref(),
            display_name,
            token_digest: &digest,
        })?;

        tracing::info!(user_id = %user.id, project_id = %claims.project_id, "Invitation accepted");
        Ok(user)
    }

    fn invite_link(&self, token: &str) -> String {
        format!(
            "{}/invite/accept?token={}",
            self.public_base_url.trim_end_matches('/'),
            urlencoding::encode(token)
        )
    }
}

fn parse_invite_role(role: Option<&str>) -> Result<ProjectRole> {
    let Some(raw) = role.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(ProjectRole::Annotator);
    };

    match ProjectRole::parse(raw) {
        Some(role) if role.is_invitable() => Ok(role),
        _ => Err(Error::InvalidRole(raw.to_string())),
    }
}
