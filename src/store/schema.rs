pub const SCHEMA: &str = r#"
-- Accounts; password_hash is NULL until an invitation is accepted
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT,
    role TEXT NOT NULL DEFAULT 'user',   -- admin | user
    display_name TEXT,
    invited INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Projects group videos; code is the human-shareable identifier
CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    code TEXT NOT NULL UNIQUE,
    created_by TEXT REFERENCES users(id) ON DELETE SET NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Membership; the first insert for a (project, user) pair wins
CREATE TABLE IF NOT EXISTS project_members (
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role TEXT NOT NULL,                  -- owner | admin | annotator
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (project_id, user_id)
);

-- Videos are either a local upload (filename) or an external reference
CREATE TABLE IF NOT EXISTS videos (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    filename TEXT,
    external_url TEXT,
    title TEXT NOT NULL,
    description TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Time-coded comments, optionally threaded through parent_id
CREATE TABLE IF NOT EXISTS annotations (
    id TEXT PRIMARY KEY,
    video_id TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    time_seconds REAL NOT NULL CHECK (time_seconds >= 0),
    content TEXT NOT NULL,
    category TEXT,
    parent_id TEXT REFERENCES annotations(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Invitation tokens are stateless; acceptance records their digest here
CREATE TABLE IF NOT EXISTS consumed_invitations (
    token_digest TEXT PRIMARY KEY,       -- sha256 hex of the raw token
    email TEXT NOT NULL,
    project_id TEXT NOT NULL,
    consumed_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_project_members_user ON project_members(user_id);
CREATE INDEX IF NOT EXISTS idx_videos_project ON videos(project_id);
CREATE INDEX IF NOT EXISTS idx_annotations_video ON annotations(video_id, time_seconds);
CREATE INDEX IF NOT EXISTS idx_annotations_parent ON annotations(parent_id);
"#;
