//! Profile picture storage behind a pluggable backend.
//!
//! `AppState` holds an `Arc<dyn UploadStore>`: S3/MinIO by default, local
//! disk when `UPLOAD_BACKEND=local`.

pub mod local;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

pub use local::LocalUploadStore;
pub use s3::S3UploadStore;

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
const PROFILE_PICTURE_PREFIX: &str = "profile_pics";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 error: {0}")]
    S3(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn put(&self, key: &str, content_type: &str, body: Bytes) -> Result<(), StorageError>;

    /// Removing a key that does not exist is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    fn backend(&self) -> &'static str;
}

/// Lowercased extension if the file name ends in an allowed image extension.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

pub fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Reduces a client-supplied file name to ASCII letters, digits, `.`, `-`
/// and `_`, with whitespace turned into `_` and leading dots stripped.
pub fn secure_filename(filename: &str) -> String {
    // Browsers on Windows may send a full path.
    let base = filename.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(filename);
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    cleaned
        .trim_start_matches(|c: char| c == '.' || c == '_')
        .to_string()
}

/// Storage key for a new profile picture: `profile_pics/<uuid>_<stem>.<extension>`.
/// The stem falls back to `picture` when nothing of it survives sanitizing.
pub fn profile_picture_key(filename: &str, extension: &str) -> String {
    let stem = filename
        .rsplit_once('.')
        .map_or(filename, |(stem, _)| stem);
    let stem = secure_filename(stem);
    let stem = stem.trim_end_matches('.');
    let stem = if stem.is_empty() { "picture" } else { stem };
    format!("{PROFILE_PICTURE_PREFIX}/{}_{stem}.{extension}", Uuid::new_v4())
}

/// Rejects keys that could escape the storage root.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..");
    if bad {
        Err(StorageError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}
