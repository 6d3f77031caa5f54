use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

use crate::media::VideoStorageError;
use crate::server::AppState;
use crate::server::response::ApiError;

/// GET /uploads/{filename}
///
/// Public so that video players can load the file without a bearer token.
pub async fn serve_upload(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let (reader, size) = state.storage.open(&filename).await.map_err(|e| match e {
        VideoStorageError::NotFound => ApiError::not_found("File not found"),
        VideoStorageError::InvalidFilename => ApiError::bad_request("Invalid filename"),
        e => {
            tracing::warn!("Upload storage error: {e}");
            ApiError::internal("Storage error")
        }
    })?;

    let body = Body::from_stream(ReaderStream::new(reader));

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&filename))
        .header(header::CONTENT_LENGTH, size)
        .header("X-Content-Type-Options", "nosniff")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "ogv" | "ogg" => "video/ogg",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        _ => "application/octet-stream",
    }
}
