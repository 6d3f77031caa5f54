mod storage;

pub use storage::{
    UploadWriter, VideoStorage, VideoStorageError, sanitize_filename, validate_filename,
};
