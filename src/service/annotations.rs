//! Time-coded annotations and the project CSV export.

use chrono::Utc;
use uuid::Uuid;

use super::access::require_project_member;
use super::validation::require_field;
use crate::error::{Error, Result};
use crate::notify::Notifier;
use crate::store::Store;
use crate::types::{Annotation, AnnotationWithAuthor, User, Video};

pub const CSV_HEADER: &str = "video;time;user;category;content;parent_id";

#[derive(Debug, Clone, Default)]
pub struct NewAnnotation<'a> {
    pub video_id: &'a str,
    pub time_seconds: f64,
    pub content: &'a str,
    pub category: Option<&'a str>,
    pub parent_id: Option<&'a str>,
}

/// Records an annotation and notifies the project's members.
///
/// The notification is dispatched after the write commits and is not
/// awaited; delivery problems never fail the request.
pub fn create(
    store: &dyn Store,
    notifier: &Notifier,
    author: &User,
    new: NewAnnotation<'_>,
) -> Result<Annotation> {
    if !new.time_seconds.is_finite() || new.time_seconds < 0.0 {
        return Err(Error::InvalidTimecode(new.time_seconds));
    }
    let content = require_field(Some(new.content), "content")?;

    let video = store.get_video(new.video_id)?.ok_or(Error::NotFound)?;
    let project = require_project_member(store, author, &video.project_id)?;

    let parent_id = match new.parent_id.map(str::trim).filter(|p| !p.is_empty()) {
        Some(parent_id) => match store.get_annotation(parent_id)? {
            Some(parent) if parent.video_id == video.id => Some(parent.id),
            _ => return Err(Error::InvalidParent),
        },
        None => None,
    };

    let annotation = Annotation {
        id: Uuid::new_v4().to_string(),
        video_id: video.id.clone(),
        user_id: author.id.clone(),
        time_seconds: new.time_seconds,
        content: content.to_string(),
        category: new
            .category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        parent_id,
        created_at: Utc::now(),
    };
    store.create_annotation(&annotation)?;

    tracing::info!(
        annotation_id = %annotation.id,
        video_id = %video.id,
        author = %author.id,
        "Annotation created"
    );

    let author_name = author.display_name.as_deref().unwrap_or(&author.email);
    notifier.notify_project_members(
        store,
        &project.id,
        format!("New annotation on \"{}\"", video.title),
        format!(
            "{author_name} annotated \"{}\" in project \"{}\" at {}:\n\n{}\n",
            video.title,
            project.title,
            format_timecode(annotation.time_seconds),
            annotation.content
        ),
    );

    Ok(annotation)
}

/// Lists a video's annotations by ascending time, insertion order on ties.
pub fn list_by_video(store: &dyn Store, user: &User, video_id: &str) -> Result<Vec<AnnotationWithAuthor>> {
    let video = load_video(store, user, video_id)?;
    store.list_video_annotations(&video.id)
}

/// Renders every annotation of a project as `;`-separated text.
///
/// Rows are ordered by video insertion, then time, then annotation
/// insertion. Free-text fields are flattened with [`sanitize_field`], so each
/// line holds exactly six fields.
pub fn export_project_csv(store: &dyn Store, user: &User, project_id: &str) -> Result<String> {
    let project = require_project_member(store, user, project_id)?;
    let rows = store.list_export_rows(&project.id)?;

    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');

    for row in rows {
        let fields = [
            sanitize_field(&row.video_title),
            row.time_seconds.to_string(),
            sanitize_field(&row.author),
            sanitize_field(row.category.as_deref().unwrap_or_default()),
            sanitize_field(&row.content),
            row.parent_id.unwrap_or_default(),
        ];
        csv.push_str(&fields.join(";"));
        csv.push('\n');
    }

    Ok(csv)
}

/// Replaces `;` with `,` and line breaks with spaces.
#[must_use]
pub fn sanitize_field(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            ';' => ',',
            '\r' | '\n' => ' ',
            other => other,
        })
        .collect()
}

fn load_video(store: &dyn Store, user: &User, video_id: &str) -> Result<Video> {
    let video = store.get_video(video_id)?.ok_or(Error::NotFound)?;
    require_project_member(store, user, &video.project_id)?;
    Ok(video)
}

fn format_timecode(seconds: f64) -> String {
    let total = seconds as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
