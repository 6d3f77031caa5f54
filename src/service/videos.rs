use chrono::Utc;
use uuid::Uuid;

use super::access::require_project_member;
use super::validation::{require_field, validate_title};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{User, Video};

/// A video to register: either an uploaded file (already written to
/// storage) or an external URL such as a Peertube watch page.
#[derive(Debug, Clone, Default)]
pub struct NewVideo<'a> {
    pub project_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub filename: Option<&'a str>,
    pub external_url: Option<&'a str>,
}

pub fn register(store: &dyn Store, user: &User, new: NewVideo<'_>) -> Result<Video> {
    let project_id = require_field(Some(new.project_id), "project_id")?;
    validate_title(new.title)?;

    let filename = non_empty(new.filename);
    let external_url = non_empty(new.external_url);

    match (filename, external_url) {
        (None, None) => {
            return Err(Error::MissingFields("video file or external_url".to_string()));
        }
        (Some(_), Some(_)) => {
            return Err(Error::BadRequest(
                "provide either a video file or an external_url, not both".to_string(),
            ));
        }
        (None, Some(url)) if !(url.starts_with("http://") || url.starts_with("https://")) => {
            return Err(Error::BadRequest("external_url must be an http(s) URL".to_string()));
        }
        _ => {}
    }

    let project = require_project_member(store, user, project_id)?;

    let video = Video {
        id: Uuid::new_v4().to_string(),
        project_id: project.id,
        filename: filename.map(str::to_string),
        external_url: external_url.map(str::to_string),
        title: new.title.trim().to_string(),
        description: non_empty(new.description).map(str::to_string),
        created_at: Utc::now(),
    };
    store.create_video(&video)?;

    tracing::info!(video_id = %video.id, project_id = %video.project_id, "Video registered");
    Ok(video)
}

pub fn get(store: &dyn Store, user: &User, video_id: &str) -> Result<Video> {
    let video = store.get_video(video_id)?.ok_or(Error::NotFound)?;
    require_project_member(store, user, &video.project_id)?;
    Ok(video)
}

pub fn list_for_project(store: &dyn Store, user: &User, project_id: &str) -> Result<Vec<Video>> {
    let project = require_project_member(store, user, project_id)?;
    store.list_project_videos(&project.id)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
