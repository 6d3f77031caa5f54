use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::{Field, MultipartError},
    },
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::media::{UploadWriter, VideoStorageError};
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};
use crate::service::access::require_project_member;
use crate::service::validation::validate_title;
use crate::service::videos::NewVideo;
use crate::service::{annotations, videos};
use crate::types::User;

pub const MAX_UPLOAD_SIZE: usize = 512 * 1024 * 1024;

#[derive(Default)]
struct VideoForm {
    project_id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    external_url: Option<String>,
    upload: Option<UploadWriter>,
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError {
        status: e.status(),
        message: format!("Failed to read multipart: {}", e.body_text()),
    }
}

fn storage_error(e: VideoStorageError) -> ApiError {
    match e {
        VideoStorageError::Empty => ApiError::bad_request("Uploaded file is empty"),
        VideoStorageError::TooLarge(limit) => ApiError::payload_too_large(format!(
            "File exceeds maximum allowed size ({limit} bytes)"
        )),
        e => {
            tracing::error!("Failed to store upload: {e}");
            ApiError::internal("Failed to store upload")
        }
    }
}

async fn read_text(field: Field<'_>) -> Result<String, ApiError> {
    let name = field.name().unwrap_or_default().to_string();
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read {name}: {e}")))
}

/// Streams the file part to storage chunk by chunk.
async fn receive_upload(state: &AppState, mut field: Field<'_>) -> Result<UploadWriter, ApiError> {
    let original_name = field.file_name().unwrap_or("video").to_string();
    let mut upload = state
        .storage
        .create(&original_name, MAX_UPLOAD_SIZE as u64)
        .await
        .map_err(storage_error)?;

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        upload.write(&chunk).await.map_err(storage_error)?;
    }

    Ok(upload)
}

async fn parse_video_form(
    state: &AppState,
    user: &User,
    multipart: &mut Multipart,
) -> Result<VideoForm, ApiError> {
    let mut form = VideoForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("project_id") => form.project_id = Some(read_text(field).await?),
            Some("title") => form.title = Some(read_text(field).await?),
            Some("description") => form.description = Some(read_text(field).await?),
            // Older clients send the Peertube link under its own name.
            Some("external_url" | "peertube_url") => {
                let url = read_text(field).await?;
                if !url.trim().is_empty() {
                    form.external_url = Some(url);
                }
            }
            Some("video") => {
                // Outsiders are turned away before any bytes are written when
                // the project comes first in the form.
                if let Some(project_id) = form.project_id.as_deref() {
                    require_project_member(state.store.as_ref(), user, project_id)?;
                }
                let upload = receive_upload(state, field).await?;
                // Browsers send an empty part when no file was picked.
                form.upload = (upload.written() > 0).then_some(upload);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /videos (multipart)
pub async fn create_video(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let form = parse_video_form(&state, &user, &mut multipart).await?;
    let store = state.store.as_ref();

    let project_id = form.project_id.as_deref().unwrap_or_default();
    let title = form.title.as_deref().unwrap_or_default();

    let filename = match form.upload {
        Some(_) if form.external_url.is_some() => {
            return Err(ApiError::bad_request(
                "Provide either a video file or an external_url, not both",
            ));
        }
        Some(upload) => {
            // The partial file is dropped, and deleted, on any rejection.
            validate_title(title)?;
            require_project_member(store, &user, project_id)?;
            Some(upload.finish().await.map_err(storage_error)?)
        }
        None => None,
    };

    let video = videos::register(
        store,
        &user,
        NewVideo {
            project_id,
            title,
            description: form.description.as_deref(),
            filename: filename.as_deref(),
            external_url: form.external_url.as_deref(),
        },
    )?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(video))))
}

/// GET /videos/{id}
pub async fn get_video(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let video = videos::get(state.store.as_ref(), &user, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(video)))
}

/// GET /videos/{id}/annotations
pub async fn list_annotations(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let annotations = annotations::list_by_video(state.store.as_ref(), &user, &id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(annotations)))
}
