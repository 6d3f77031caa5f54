mod secrets;
mod server;

pub use secrets::{INVITE_SECRET_ENV, SECRETS_FILE, SESSION_SECRET_ENV, Secrets, secrets_path};
pub use server::{DEFAULT_PUBLIC_BASE_URL, ServerConfig};
