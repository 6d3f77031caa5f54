use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::admin::admin_router;
use super::uploads::serve_upload;
use super::user::user_router;
use crate::auth::{PasswordHasher, TokenService};
use crate::media::VideoStorage;
use crate::notify::Notifier;
use crate::service::invitations::InvitationWorkflow;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub data_dir: PathBuf,
    /// Public base URL of the web front end. Invitation links point here.
    pub public_base_url: String,
    pub tokens: TokenService,
    pub passwords: PasswordHasher,
    pub notifier: Notifier,
    pub storage: VideoStorage,
}

impl AppState {
    #[must_use]
    pub fn invitations(&self) -> InvitationWorkflow<'_> {
        InvitationWorkflow {
            store: self.store.as_ref(),
            tokens: &self.tokens,
            passwords: &self.passwords,
            notifier: &self.notifier,
            public_base_url: &self.public_base_url,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1", user_router())
        .route("/uploads/{filename}", get(serve_upload))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
