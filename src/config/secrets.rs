use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::auth::generate_secret;
use crate::error::{Error, Result};

pub const SECRETS_FILE: &str = "secrets.toml";

pub const SESSION_SECRET_ENV: &str = "SESSION_SECRET";
pub const INVITE_SECRET_ENV: &str = "INVITE_SECRET";

/// Signing secrets for the two token domains, kept next to the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secrets {
    pub session_secret: String,
    pub invitation_secret: String,
}

impl Secrets {
    #[must_use]
    pub fn generate() -> Self {
        Self {
            session_secret: generate_secret(),
            invitation_secret: generate_secret(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid secrets file {}: {e}", path.display())))
    }

    /// Writes the file readable by the owner only.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to encode secrets: {e}")))?;
        fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Replaces either secret with its environment override, if set.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(SESSION_SECRET_ENV).ok(),
            std::env::var(INVITE_SECRET_ENV).ok(),
        )
    }

    fn with_overrides(mut self, session: Option<String>, invitation: Option<String>) -> Self {
        if let Some(secret) = session.filter(|s| !s.is_empty()) {
            self.session_secret = secret;
        }
        if let Some(secret) = invitation.filter(|s| !s.is_empty()) {
            self.invitation_secret = secret;
        }
        self
    }
}

#[must_use]
pub fn secrets_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SECRETS_FILE)
}
