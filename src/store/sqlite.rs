use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const USER_COLUMNS: &str =
    "id, email, password_hash, role, display_name, invited, created_at, updated_at";
const PROJECT_COLUMNS: &str = "id, title, description, code, created_by, created_at";
const VIDEO_COLUMNS: &str =
    "id, project_id, filename, external_url, title, description, created_at";
const ANNOTATION_COLUMNS: &str =
    "id, video_id, user_id, time_seconds, content, category, parent_id, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        role: row.get(3)?,
        display_name: row.get(4)?,
        invited: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        code: row.get(3)?,
        created_by: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn video_from_row(row: &Row<'_>) -> rusqlite::Result<Video> {
    Ok(Video {
        id: row.get(0)?,
        project_id: row.get(1)?,
        filename: row.get(2)?,
        external_url: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn annotation_from_row(row: &Row<'_>) -> rusqlite::Result<Annotation> {
    Ok(Annotation {
        id: row.get(0)?,
        video_id: row.get(1)?,
        user_id: row.get(2)?,
        time_seconds: row.get(3)?,
        content: row.get(4)?,
        category: row.get(5)?,
        parent_id: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn get_user_by_email_in(conn: &Connection, email: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        params![email],
        user_from_row,
    )
    .optional()
    .map_err(Error::from)
}

fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, password_hash, role, display_name, invited, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id,
            user.email,
            user.password_hash,
            user.role,
            user.display_name,
            user.invited,
            format_datetime(&user.created_at),
            format_datetime(&user.updated_at),
        ],
    )?;
    Ok(())
}

/// Returns the user and whether the row already existed.
fn ensure_user_in(conn: &Connection, email: &str) -> Result<(User, bool)> {
    if let Some(user) = get_user_by_email_in(conn, email)? {
        return Ok((user, true));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        password_hash: None,
        role: UserRole::User,
        display_name: None,
        invited: true,
        created_at: now,
        updated_at: now,
    };
    insert_user(conn, &user)?;
    Ok((user, false))
}

fn project_exists(conn: &Connection, project_id: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)",
        params![project_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Inserts the membership unless the pair already exists.
/// Returns false when an existing row was kept untouched.
fn insert_membership_if_absent(
    conn: &Connection,
    project_id: &str,
    user_id: &str,
    role: ProjectRole,
) -> Result<bool> {
    let rows = conn.execute(
        "INSERT INTO project_members (project_id, user_id, role, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (project_id, user_id) DO NOTHING",
        params![project_id, user_id, role, format_datetime(&Utc::now())],
    )?;
    Ok(rows > 0)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let conn = self.conn();
        match insert_user(&conn, user) {
            Err(Error::Database(e)) if is_unique_violation(&e) => Err(Error::BadRequest(
                format!("a user with email '{}' already exists", user.email),
            )),
            other => other,
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        get_user_by_email_in(&self.conn(), email)
    }

    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email > ?1 ORDER BY email LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn ensure_user(&self, email: &str) -> Result<User> {
        let (user, _) = ensure_user_in(&self.conn(), email)?;
        Ok(user)
    }

    fn set_user_password(
        &self,
        email: &str,
        password_hash: &str,
        display_name: Option<&str>,
    ) -> Result<User> {
        let conn = self.conn();
        let rows = conn.execute(
            "UPDATE users
             SET password_hash = ?1, display_name = COALESCE(?2, display_name),
                 invited = 0, updated_at = ?3
             WHERE email = ?4",
            params![
                password_hash,
                display_name,
                format_datetime(&Utc::now()),
                email
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }

        get_user_by_email_in(&conn, email)?.ok_or(Error::NotFound)
    }

    fn has_admin_user(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = 'admin' AND password_hash IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Project operations

    fn create_project(&self, project: &Project, owner_id: &str) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE code = ?1)",
            params![project.code],
            |row| row.get(0),
        )?;
        if taken {
            return Err(Error::CodeCollision);
        }

        let inserted = tx.execute(
            "INSERT INTO projects (id, title, description, code, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.id,
                project.title,
                project.description,
                project.code,
                project.created_by,
                format_datetime(&project.created_at),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(Error::CodeCollision),
            Err(e) => return Err(Error::from(e)),
        }

        insert_membership_if_absent(&tx, &project.id, owner_id, ProjectRole::Owner)?;

        tx.commit()?;
        Ok(())
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
            params![id],
            project_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_project_by_code(&self, code: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE code = ?1"),
            params![code],
            project_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_project_summaries(&self, member_id: Option<&str>) -> Result<Vec<ProjectSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.title, p.description, p.code, p.created_by, p.created_at,
                    (SELECT COUNT(*) FROM videos v WHERE v.project_id = p.id),
                    (SELECT COUNT(*) FROM annotations a
                       JOIN videos v ON a.video_id = v.id
                      WHERE v.project_id = p.id)
             FROM projects p
             WHERE ?1 IS NULL
                OR EXISTS (SELECT 1 FROM project_members m
                            WHERE m.project_id = p.id AND m.user_id = ?1)
             ORDER BY p.rowid",
        )?;

        let rows = stmt.query_map(params![member_id], |row| {
            Ok(ProjectSummary {
                project: project_from_row(row)?,
                video_count: row.get(6)?,
                annotation_count: row.get(7)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Membership operations

    fn get_membership(&self, project_id: &str, user_id: &str) -> Result<Option<ProjectMember>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT project_id, user_id, role, created_at
             FROM project_members WHERE project_id = ?1 AND user_id = ?2",
            params![project_id, user_id],
            |row| {
                Ok(ProjectMember {
                    project_id: row.get(0)?,
                    user_id: row.get(1)?,
                    role: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_members(&self, project_id: &str) -> Result<Vec<MemberDetail>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT u.id, u.email, u.display_name, m.role, u.invited
             FROM project_members m
             JOIN users u ON u.id = m.user_id
             WHERE m.project_id = ?1
             ORDER BY m.rowid",
        )?;

        let rows = stmt.query_map(params![project_id], |row| {
            Ok(MemberDetail {
                user_id: row.get(0)?,
                email: row.get(1)?,
                display_name: row.get(2)?,
                role: row.get(3)?,
                invited: row.get(4)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_memberships(&self, user_id: &str) -> Result<Vec<ProjectMember>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT project_id, user_id, role, created_at
             FROM project_members WHERE user_id = ?1 ORDER BY rowid",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(ProjectMember {
                project_id: row.get(0)?,
                user_id: row.get(1)?,
                role: row.get(2)?,
                created_at: parse_datetime(&row.get::<_, String>(3)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_member_emails(&self, project_id: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT u.email FROM project_members m
             JOIN users u ON u.id = m.user_id
             WHERE m.project_id = ?1
             ORDER BY m.rowid",
        )?;

        let rows = stmt.query_map(params![project_id], |row| row.get(0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn invite_member(
        &self,
        project_id: &str,
        email: &str,
        role: ProjectRole,
    ) -> Result<InviteOutcome> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        if !project_exists(&tx, project_id)? {
            return Err(Error::NotFound);
        }

        let (mut user, existed) = ensure_user_in(&tx, email)?;
        if existed && !user.invited {
            let now = Utc::now();
            tx.execute(
                "UPDATE users SET invited = 1, updated_at = ?1 WHERE id = ?2",
                params![format_datetime(&now), user.id],
            )?;
            user.invited = true;
            user.updated_at = now;
        }

        let membership_created = insert_membership_if_absent(&tx, project_id, &user.id, role)?;

        tx.commit()?;
        Ok(InviteOutcome {
            user,
            membership_created,
        })
    }

    fn activate_invitation(&self, activation: &Activation<'_>) -> Result<User> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let consumed: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM consumed_invitations WHERE token_digest = ?1)",
            params![activation.token_digest],
            |row| row.get(0),
        )?;
        if consumed {
            return Err(Error::InvitationUsed);
        }

        if !project_exists(&tx, activation.project_id)? {
            return Err(Error::NotFound);
        }

        let (user, _) = ensure_user_in(&tx, activation.email)?;

        match activation.password_hash {
            Some(password_hash) => {
                // Only a placeholder account takes a credential from an invitation.
                let rows = tx.execute(
                    "UPDATE users
                     SET password_hash = ?1, display_name = COALESCE(?2, display_name),
                         invited = 0, updated_at = ?3
                     WHERE id = ?4 AND password_hash IS NULL",
                    params![
                        password_hash,
                        activation.display_name,
                        format_datetime(&Utc::now()),
                        user.id
                    ],
                )?;
                if rows == 0 {
                    return Err(Error::InvalidCredentials);
                }
            }
            None => {
                if user.password_hash.is_none() {
                    return Err(Error::AccountNotActivated);
                }
                tx.execute(
                    "UPDATE users SET invited = 0, updated_at = ?1 WHERE id = ?2",
                    params![format_datetime(&Utc::now()), user.id],
                )?;
            }
        }

        insert_membership_if_absent(&tx, activation.project_id, &user.id, activation.role)?;

        tx.execute(
            "INSERT INTO consumed_invitations (token_digest, email, project_id, consumed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                activation.token_digest,
                activation.email,
                activation.project_id,
                format_datetime(&Utc::now()),
            ],
        )?;

        let user = get_user_by_email_in(&tx, activation.email)?.ok_or(Error::NotFound)?;

        tx.commit()?;
        Ok(user)
    }

    fn is_invitation_consumed(&self, token_digest: &str) -> Result<bool> {
        let conn = self.conn();
        let consumed: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM consumed_invitations WHERE token_digest = ?1)",
            params![token_digest],
            |row| row.get(0),
        )?;
        Ok(consumed)
    }

    // Video operations

    fn create_video(&self, video: &Video) -> Result<()> {
        self.conn().execute(
            "INSERT INTO videos (id, project_id, filename, external_url, title, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                video.id,
                video.project_id,
                video.filename,
                video.external_url,
                video.title,
                video.description,
                format_datetime(&video.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_video(&self, id: &str) -> Result<Option<Video>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?1"),
            params![id],
            video_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_project_videos(&self, project_id: &str) -> Result<Vec<Video>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE project_id = ?1 ORDER BY rowid"
        ))?;

        let rows = stmt.query_map(params![project_id], video_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Annotation operations

    fn create_annotation(&self, annotation: &Annotation) -> Result<()> {
        self.conn().execute(
            "INSERT INTO annotations (id, video_id, user_id, time_seconds, content, category, parent_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                annotation.id,
                annotation.video_id,
                annotation.user_id,
                annotation.time_seconds,
                annotation.content,
                annotation.category,
                annotation.parent_id,
                format_datetime(&annotation.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_annotation(&self, id: &str) -> Result<Option<Annotation>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ANNOTATION_COLUMNS} FROM annotations WHERE id = ?1"),
            params![id],
            annotation_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_video_annotations(&self, video_id: &str) -> Result<Vec<AnnotationWithAuthor>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT a.id, a.video_id, a.user_id, a.time_seconds, a.content, a.category,
                    a.parent_id, a.created_at, u.display_name
             FROM annotations a
             LEFT JOIN users u ON a.user_id = u.id
             WHERE a.video_id = ?1
             ORDER BY a.time_seconds, a.rowid",
        )?;

        let rows = stmt.query_map(params![video_id], |row| {
            Ok(AnnotationWithAuthor {
                annotation: annotation_from_row(row)?,
                display_name: row.get(8)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_export_rows(&self, project_id: &str) -> Result<Vec<ExportRow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT v.title, a.time_seconds, COALESCE(u.display_name, u.email),
                    a.category, a.content, a.parent_id
             FROM annotations a
             JOIN videos v ON a.video_id = v.id
             JOIN users u ON a.user_id = u.id
             WHERE v.project_id = ?1
             ORDER BY v.rowid, a.time_seconds, a.rowid",
        )?;

        let rows = stmt.query_map(params![project_id], |row| {
            Ok(ExportRow {
                video_title: row.get(0)?,
                time_seconds: row.get(1)?,
                author: row.get(2)?,
                category: row.get(3)?,
                content: row.get(4)?,
                parent_id: row.get(5)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn user(id: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            email: email.to_string(),
            password_hash: Some("hash".to_string()),
            role: UserRole::User,
            display_name: None,
            invited: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn project(id: &str, code: &str, owner: &str) -> Project {
        Project {
            id: id.to_string(),
            title: format!("Project {id}"),
            description: None,
            code: code.to_string(),
            created_by: Some(owner.to_string()),
            created_at: Utc::now(),
        }
    }

    fn video(id: &str, project_id: &str) -> Video {
        Video {
            id: id.to_string(),
            project_id: project_id.to_string(),
            filename: None,
            external_url: Some("https://peertube.example/w/abc".to_string()),
            title: format!("Video {id}"),
            description: None,
            created_at: Utc::now(),
        }
    }

    fn annotation(id: &str, video_id: &str, user_id: &str, time: f64) -> Annotation {
        Annotation {
            id: id.to_string(),
            video_id: video_id.to_string(),
            user_id: user_id.to_string(),
            time_seconds: time,
            content: format!("note {id}"),
            category: None,
            parent_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = test_store();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"projects".to_string()));
        assert!(tables.contains(&"project_members".to_string()));
        assert!(tables.contains(&"videos".to_string()));
        assert!(tables.contains(&"annotations".to_string()));
        assert!(tables.contains(&"consumed_invitations".to_string()));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (_temp, store) = test_store();
        store.initialize().unwrap();
    }

    #[test]
    fn test_ensure_user_is_idempotent() {
        let (_temp, store) = test_store();

        let first = store.ensure_user("bob@example.com").unwrap();
        assert!(first.invited);
        assert!(!first.is_activated());

        let second = store.ensure_user("bob@example.com").unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_email_is_case_sensitive() {
        let (_temp, store) = test_store();

        let lower = store.ensure_user("bob@example.com").unwrap();
        let upper = store.ensure_user("Bob@example.com").unwrap();
        assert_ne!(lower.id, upper.id);
    }

    #[test]
    fn test_create_user_duplicate_email() {
        let (_temp, store) = test_store();

        store.create_user(&user("u-1", "a@example.com")).unwrap();
        let result = store.create_user(&user("u-2", "a@example.com"));
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[test]
    fn test_set_user_password_clears_invited() {
        let (_temp, store) = test_store();

        store.ensure_user("bob@example.com").unwrap();
        let updated = store
            .set_user_password("bob@example.com", "new-hash", Some("Bob"))
            .unwrap();
        assert!(!updated.invited);
        assert_eq!(updated.password_hash.as_deref(), Some("new-hash"));
        assert_eq!(updated.display_name.as_deref(), Some("Bob"));

        let kept = store
            .set_user_password("bob@example.com", "newer-hash", None)
            .unwrap();
        assert_eq!(kept.display_name.as_deref(), Some("Bob"));

        let missing = store.set_user_password("nobody@example.com", "h", None);
        assert!(matches!(missing, Err(Error::NotFound)));
    }

    #[test]
    fn test_create_project_adds_owner() {
        let (_temp, store) = test_store();
        store.create_user(&user("u-1", "owner@example.com")).unwrap();

        store
            .create_project(&project("p-1", "PRJ-AAAAAA", "u-1"), "u-1")
            .unwrap();

        let membership = store.get_membership("p-1", "u-1").unwrap().unwrap();
        assert_eq!(membership.role, ProjectRole::Owner);

        let by_code = store.get_project_by_code("PRJ-AAAAAA").unwrap().unwrap();
        assert_eq!(by_code.id, "p-1");
    }

    #[test]
    fn test_create_project_code_collision() {
        let (_temp, store) = test_store();
        store.create_user(&user("u-1", "owner@example.com")).unwrap();

        store
            .create_project(&project("p-1", "PRJ-AAAAAA", "u-1"), "u-1")
            .unwrap();
        let result = store.create_project(&project("p-2", "PRJ-AAAAAA", "u-1"), "u-1");
        assert!(matches!(result, Err(Error::CodeCollision)));
        assert!(store.get_project("p-2").unwrap().is_none());
    }

    #[test]
    fn test_create_project_rolls_back_without_owner() {
        let (_temp, store) = test_store();

        let mut p = project("p-1", "PRJ-BBBBBB", "ghost");
        p.created_by = None;
        let result = store.create_project(&p, "ghost");
        assert!(result.is_err());
        assert!(store.get_project("p-1").unwrap().is_none());
    }

    #[test]
    fn test_invite_member_keeps_first_role() {
        let (_temp, store) = test_store();
        store.create_user(&user("u-1", "owner@example.com")).unwrap();
        store
            .create_project(&project("p-1", "PRJ-CCCCCC", "u-1"), "u-1")
            .unwrap();

        let first = store
            .invite_member("p-1", "bob@example.com", ProjectRole::Annotator)
            .unwrap();
        assert!(first.membership_created);

        let second = store
            .invite_member("p-1", "bob@example.com", ProjectRole::Admin)
            .unwrap();
        assert!(!second.membership_created);
        assert_eq!(first.user.id, second.user.id);

        let membership = store.get_membership("p-1", &first.user.id).unwrap().unwrap();
        assert_eq!(membership.role, ProjectRole::Annotator);
    }

    #[test]
    fn test_invite_member_unknown_project() {
        let (_temp, store) = test_store();

        let result = store.invite_member("missing", "bob@example.com", ProjectRole::Annotator);
        assert!(matches!(result, Err(Error::NotFound)));
        assert!(store.get_user_by_email("bob@example.com").unwrap().is_none());
    }

    #[test]
    fn test_activate_invitation_is_single_use() {
        let (_temp, store) = test_store();
        store.create_user(&user("u-1", "owner@example.com")).unwrap();
        store
            .create_project(&project("p-1", "PRJ-DDDDDD", "u-1"), "u-1")
            .unwrap();
        store
            .invite_member("p-1", "bob@example.com", ProjectRole::Annotator)
            .unwrap();

        let activation = Activation {
            email: "bob@example.com",
            project_id: "p-1",
            role: ProjectRole::Annotator,
            password_hash: Some("hash-1"),
            display_name: Some("Bob"),
            token_digest: "digest-1",
        };

        let activated = store.activate_invitation(&activation).unwrap();
        assert!(!activated.invited);
        assert_eq!(activated.password_hash.as_deref(), Some("hash-1"));
        assert!(store.is_invitation_consumed("digest-1").unwrap());

        let replay = Activation {
            password_hash: Some("hash-2"),
            ..activation
        };
        assert!(matches!(
            store.activate_invitation(&replay),
            Err(Error::InvitationUsed)
        ));

        let unchanged = store.get_user_by_email("bob@example.com").unwrap().unwrap();
        assert_eq!(unchanged.password_hash.as_deref(), Some("hash-1"));
    }

    #[test]
    fn test_activate_invitation_keeps_existing_credential() {
        let (_temp, store) = test_store();
        store.create_user(&user("u-1", "owner@example.com")).unwrap();
        store.create_user(&user("u-2", "carol@example.com")).unwrap();
        store
            .create_project(&project("p-1", "PRJ-GGGGGG", "u-1"), "u-1")
            .unwrap();
        store
            .invite_member("p-1", "carol@example.com", ProjectRole::Admin)
            .unwrap();

        let overwrite = Activation {
            email: "carol@example.com",
            project_id: "p-1",
            role: ProjectRole::Admin,
            password_hash: Some("attacker-hash"),
            display_name: Some("Mallory"),
            token_digest: "digest-1",
        };
        assert!(matches!(
            store.activate_invitation(&overwrite),
            Err(Error::InvalidCredentials)
        ));
        assert!(!store.is_invitation_consumed("digest-1").unwrap());

        let carol = store.get_user_by_email("carol@example.com").unwrap().unwrap();
        assert_eq!(carol.password_hash.as_deref(), Some("hash"));
        assert_eq!(carol.display_name, None);

        let join = Activation {
            password_hash: None,
            display_name: None,
            ..overwrite
        };
        let joined = store.activate_invitation(&join).unwrap();
        assert_eq!(joined.password_hash.as_deref(), Some("hash"));
        assert!(!joined.invited);
        assert!(store.is_invitation_consumed("digest-1").unwrap());
        assert!(store.get_membership("p-1", "u-2").unwrap().is_some());
    }

    #[test]
    fn test_activate_invitation_without_credential_needs_one() {
        let (_temp, store) = test_store();
        store.create_user(&user("u-1", "owner@example.com")).unwrap();
        store
            .create_project(&project("p-1", "PRJ-HHHHHH", "u-1"), "u-1")
            .unwrap();
        store
            .invite_member("p-1", "bob@example.com", ProjectRole::Annotator)
            .unwrap();

        let result = store.activate_invitation(&Activation {
            email: "bob@example.com",
            project_id: "p-1",
            role: ProjectRole::Annotator,
            password_hash: None,
            display_name: None,
            token_digest: "digest-1",
        });
        assert!(matches!(result, Err(Error::AccountNotActivated)));
        assert!(!store.is_invitation_consumed("digest-1").unwrap());
    }

    #[test]
    fn test_annotations_ordered_by_time_then_insertion() {
        let (_temp, store) = test_store();
        store.create_user(&user("u-1", "owner@example.com")).unwrap();
        store
            .create_project(&project("p-1", "PRJ-EEEEEE", "u-1"), "u-1")
            .unwrap();
        store.create_video(&video("v-1", "p-1")).unwrap();

        store.create_annotation(&annotation("z", "v-1", "u-1", 5.0)).unwrap();
        store.create_annotation(&annotation("b", "v-1", "u-1", 1.5)).unwrap();
        store.create_annotation(&annotation("a", "v-1", "u-1", 5.0)).unwrap();
        store.create_annotation(&annotation("m", "v-1", "u-1", 0.0)).unwrap();

        let ids: Vec<String> = store
            .list_video_annotations("v-1")
            .unwrap()
            .into_iter()
            .map(|a| a.annotation.id)
            .collect();
        assert_eq!(ids, vec!["m", "b", "z", "a"]);
    }

    #[test]
    fn test_negative_timecode_rejected_by_schema() {
        let (_temp, store) = test_store();
        store.create_user(&user("u-1", "owner@example.com")).unwrap();
        store
            .create_project(&project("p-1", "PRJ-FFFFFF", "u-1"), "u-1")
            .unwrap();
        store.create_video(&video("v-1", "p-1")).unwrap();

        let result = store.create_annotation(&annotation("x", "v-1", "u-1", -1.0));
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[test]
    fn test_project_summaries_counts_and_visibility() {
        let (_temp, store) = test_store();
        store.create_user(&user("u-1", "one@example.com")).unwrap();
        store.create_user(&user("u-2", "two@example.com")).unwrap();
        store
            .create_project(&project("p-1", "PRJ-GGGGGG", "u-1"), "u-1")
            .unwrap();
        store
            .create_project(&project("p-2", "PRJ-HHHHHH", "u-2"), "u-2")
            .unwrap();
        store.create_video(&video("v-1", "p-1")).unwrap();
        store.create_video(&video("v-2", "p-1")).unwrap();
        store.create_annotation(&annotation("a", "v-1", "u-1", 1.0)).unwrap();
        store.create_annotation(&annotation("b", "v-2", "u-1", 2.0)).unwrap();
        store.create_annotation(&annotation("c", "v-2", "u-1", 3.0)).unwrap();

        let all = store.list_project_summaries(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].video_count, 2);
        assert_eq!(all[0].annotation_count, 3);
        assert_eq!(all[1].video_count, 0);

        let mine = store.list_project_summaries(Some("u-2")).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].project.id, "p-2");
    }

    #[test]
    fn test_export_rows_fall_back_to_email() {
        let (_temp, store) = test_store();
        store.create_user(&user("u-1", "one@example.com")).unwrap();
        store
            .create_project(&project("p-1", "PRJ-IIIIII", "u-1"), "u-1")
            .unwrap();
        store.create_video(&video("v-1", "p-1")).unwrap();
        store.create_annotation(&annotation("a", "v-1", "u-1", 1.0)).unwrap();

        let rows = store.list_export_rows("p-1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].author, "one@example.com");
        assert_eq!(rows[0].video_title, "Video v-1");
    }
}
