use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;

use crate::auth::DEFAULT_SESSION_TTL_HOURS;

pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Public base URL of the web front end (e.g. "https://annotate.example.org").
    /// Invitation links are built from it.
    pub public_base_url: String,
    pub session_ttl_hours: i64,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("vialog.db")
    }

    #[must_use]
    pub fn secrets_path(&self) -> PathBuf {
        super::secrets_path(&self.data_dir)
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.session_ttl_hours)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
        }
    }
}
