use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufReader};
use uuid::Uuid;

const MAX_NAME_LEN: usize = 120;

#[derive(Debug, Error)]
pub enum VideoStorageError {
    #[error("file not found")]
    NotFound,
    #[error("invalid filename")]
    InvalidFilename,
    #[error("empty upload")]
    Empty,
    #[error("upload exceeds {0} bytes")]
    TooLarge(u64),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl VideoStorageError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

/// Flat directory of uploaded video files under `<data_dir>/uploads`.
pub struct VideoStorage {
    base_path: PathBuf,
}

impl VideoStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            base_path: data_dir.join("uploads"),
        }
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path.join(".tmp").join(Uuid::new_v4().to_string())
    }

    /// Starts an upload. Chunks go to a temp file that becomes
    /// `<unix millis>_<sanitized original name>` on [`UploadWriter::finish`].
    /// Writes past `max_size` bytes fail with `TooLarge`.
    pub async fn create(
        &self,
        original_name: &str,
        max_size: u64,
    ) -> Result<UploadWriter, VideoStorageError> {
        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let file = File::create(&temp_path).await?;

        Ok(UploadWriter {
            file,
            temp_path,
            base_path: self.base_path.clone(),
            name: sanitize_filename(original_name),
            written: 0,
            max_size,
            committed: false,
        })
    }

    pub async fn open(&self, filename: &str) -> Result<(BufReader<File>, u64), VideoStorageError> {
        validate_filename(filename)?;
        let file = File::open(self.base_path.join(filename))
            .await
            .map_err(VideoStorageError::from_io)?;

        let size = file.metadata().await?.len();

        Ok((BufReader::new(file), size))
    }
}

/// An upload in progress. Dropping it before [`UploadWriter::finish`]
/// deletes the partial file.
pub struct UploadWriter {
    file: File,
    temp_path: PathBuf,
    base_path: PathBuf,
    name: String,
    written: u64,
    max_size: u64,
    committed: bool,
}

impl UploadWriter {
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), VideoStorageError> {
        let written = self.written + chunk.len() as u64;
        if written > self.max_size {
            return Err(VideoStorageError::TooLarge(self.max_size));
        }
        self.file.write_all(chunk).await?;
        self.written = written;
        Ok(())
    }

    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Moves the file into place and returns its storage-relative filename.
    pub async fn finish(mut self) -> Result<String, VideoStorageError> {
        if self.written == 0 {
            return Err(VideoStorageError::Empty);
        }

        self.file.sync_all().await?;

        let filename = format!("{}_{}", Utc::now().timestamp_millis(), self.name);
        fs::rename(&self.temp_path, self.base_path.join(&filename)).await?;
        self.committed = true;

        Ok(filename)
    }
}

impl Drop for UploadWriter {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}

/// Keeps ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    // Browsers may send a full client path.
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let mut sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = sanitized.trim_start_matches('.');
    if trimmed.len() != sanitized.len() {
        sanitized = trimmed.to_string();
    }
    sanitized.truncate(MAX_NAME_LEN);

    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}

/// Rejects anything that could escape the uploads directory.
pub fn validate_filename(filename: &str) -> Result<(), VideoStorageError> {
    if filename.is_empty()
        || filename.starts_with('.')
        || filename.contains(['/', '\\'])
        || filename.contains("..")
    {
        return Err(VideoStorageError::InvalidFilename);
    }
    Ok(())
}
