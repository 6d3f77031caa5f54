mod annotations;
mod auth;
mod invitations;
mod projects;
mod videos;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::server::AppState;

pub use videos::MAX_UPLOAD_SIZE;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Projects
        .route("/projects", get(projects::list_projects))
        .route("/projects", post(projects::create_project))
        .route("/projects/code/{code}", get(projects::get_project_by_code))
        .route("/projects/{id}/members", get(projects::list_members))
        .route("/projects/{id}/invitations", post(invitations::invite))
        .route("/projects/{id}/videos", get(projects::list_videos))
        .route("/projects/{id}/export", get(projects::export_csv))
        // Invitations (public, the token is the credential)
        .route("/invitations/validate", get(invitations::validate))
        .route("/invitations/accept", post(invitations::accept))
        // Videos
        .route(
            "/videos",
            post(videos::create_video).layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE)),
        )
        .route("/videos/{id}", get(videos::get_video))
        .route("/videos/{id}/annotations", get(videos::list_annotations))
        // Annotations
        .route("/annotations", post(annotations::create_annotation))
}
