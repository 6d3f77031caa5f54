use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use super::validation::validate_title;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{MemberDetail, Project, ProjectSummary, User};

pub const CODE_PREFIX: &str = "PRJ-";
pub const CODE_LEN: usize = 6;
pub const MAX_CODE_ATTEMPTS: u32 = 5;

const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Draws a fresh `PRJ-XXXXXX` code, uniform over `[0-9A-Z]`.
#[must_use]
pub fn generate_project_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{CODE_PREFIX}{suffix}")
}

#[must_use]
pub fn is_valid_project_code(code: &str) -> bool {
    code.strip_prefix(CODE_PREFIX).is_some_and(|suffix| {
        suffix.len() == CODE_LEN && suffix.bytes().all(|b| CODE_ALPHABET.contains(&b))
    })
}

/// Creates a project owned by `creator`.
pub fn create_project(
    store: &dyn Store,
    title: &str,
    description: Option<&str>,
    creator: &User,
) -> Result<Project> {
    create_project_with(store, title, description, creator, generate_project_code)
}

/// Creates a project, drawing codes from `next_code` until one is free.
///
/// The project row and the owner membership land in one transaction, so a
/// failure never leaves an ownerless project behind.
pub fn create_project_with(
    store: &dyn Store,
    title: &str,
    description: Option<&str>,
    creator: &User,
    mut next_code: impl FnMut() -> String,
) -> Result<Project> {
    validate_title(title)?;

    let description = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let project = Project {
            id: Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            description: description.clone(),
            code: next_code(),
            created_by: Some(creator.id.clone()),
            created_at: Utc::now(),
        };

        match store.create_project(&project, &creator.id) {
            Ok(()) => {
                tracing::info!(project_id = %project.id, code = %project.code, "Created project");
                return Ok(project);
            }
            Err(Error::CodeCollision) => {
                tracing::debug!(attempt, code = %project.code, "Project code collision, retrying");
            }
            Err(e) => return Err(e),
        }
    }

    tracing::warn!("Gave up generating a project code after {MAX_CODE_ATTEMPTS} attempts");
    Err(Error::CodeGenerationExhausted(MAX_CODE_ATTEMPTS))
}

/// Lists projects with their counts. Global admins see all projects, other
/// users only the ones they belong to.
pub fn list_projects(store: &dyn Store, user: &User) -> Result<Vec<ProjectSummary>> {
    if user.is_admin() {
        store.list_project_summaries(None)
    } else {
        store.list_project_summaries(Some(&user.id))
    }
}

pub fn get_by_code(store: &dyn Store, code: &str) -> Result<Project> {
    store.get_project_by_code(code)?.ok_or(Error::NotFound)
}

pub fn list_members(store: &dyn Store, project_id: &str) -> Result<Vec<MemberDetail>> {
    if store.get_project(project_id)?.is_none() {
        return Err(Error::NotFound);
    }
    store.list_members(project_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::{TestEnv, activated_user};
    use crate::types::{ProjectRole, UserRole};

    #[test]
    fn test_generated_codes_are_well_formed() {
        for _ in 0..200 {
            let code = generate_project_code();
            assert!(is_valid_project_code(&code), "{code}");
        }
        assert!(!is_valid_project_code("PRJ-abc123"));
        assert!(!is_valid_project_code("PRJ-ABC12"));
        assert!(!is_valid_project_code("ABC-ABC123"));
    }

    #[test]
    fn test_creator_becomes_owner() {
        let env = TestEnv::new();
        let creator = activated_user(&env, "owner@example.com", UserRole::User);

        let project = create_project(env.store(), "  Demo  ", Some("  "), &creator).unwrap();
        assert_eq!(project.title, "Demo");
        assert_eq!(project.description, None);
        assert!(is_valid_project_code(&project.code));

        let members = list_members(env.store(), &project.id).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, creator.id);
        assert_eq!(members[0].role, ProjectRole::Owner);
    }

    #[test]
    fn test_code_collision_retries() {
        let env = TestEnv::new();
        let creator = activated_user(&env, "owner@example.com", UserRole::User);

        let first = create_project_with(env.store(), "A", None, &creator, || {
            "PRJ-AAAAAA".to_string()
        })
        .unwrap();

        let mut codes = vec!["PRJ-BBBBBB", "PRJ-AAAAAA", "PRJ-AAAAAA"];
        let second = create_project_with(env.store(), "B", None, &creator, || {
            codes.pop().unwrap().to_string()
        })
        .unwrap();

        assert_eq!(first.code, "PRJ-AAAAAA");
        assert_eq!(second.code, "PRJ-BBBBBB");
    }

    #[test]
    fn test_code_generation_exhausted() {
        let env = TestEnv::new();
        let creator = activated_user(&env, "owner@example.com", UserRole::User);

        create_project_with(env.store(), "A", None, &creator, || "PRJ-AAAAAA".to_string()).unwrap();

        let mut attempts = 0;
        let result = create_project_with(env.store(), "B", None, &creator, || {
            attempts += 1;
            "PRJ-AAAAAA".to_string()
        });

        assert!(matches!(result, Err(Error::CodeGenerationExhausted(5))));
        assert_eq!(attempts, 5);
        assert_eq!(env.store().list_project_summaries(None).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_title_rejected() {
        let env = TestEnv::new();
        let creator = activated_user(&env, "owner@example.com", UserRole::User);

        assert!(matches!(
            create_project(env.store(), " ", None, &creator),
            Err(Error::MissingFields(_))
        ));
    }

    #[test]
    fn test_list_projects_scoped_to_membership() {
        let env = TestEnv::new();
        let alice = activated_user(&env, "alice@example.com", UserRole::User);
        let carol = activated_user(&env, "carol@example.com", UserRole::User);
        let admin = activated_user(&env, "admin@example.com", UserRole::Admin);

        env.project("Alice's", &alice);
        env.project("Carol's", &carol);

        let visible = list_projects(env.store(), &alice).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].project.title, "Alice's");

        assert_eq!(list_projects(env.store(), &admin).unwrap().len(), 2);
    }

    #[test]
    fn test_get_by_code() {
        let env = TestEnv::new();
        let creator = activated_user(&env, "owner@example.com", UserRole::User);
        let project = env.project("Demo", &creator);

        assert_eq!(get_by_code(env.store(), &project.code).unwrap().id, project.id);
        assert!(matches!(get_by_code(env.store(), "PRJ-ZZZZZZ"), Err(Error::NotFound)));
    }
}
