use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::info;

use crate::uploads::{validate_key, StorageError, UploadStore};

/// Stores uploads under a directory on local disk.
///
/// Files are written to a temp file in the target directory and renamed into
/// place, so readers never see a partial image.
pub struct LocalUploadStore {
    root: PathBuf,
}

impl LocalUploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

fn write_atomically(path: &Path, body: &[u8]) -> Result<(), StorageError> {
    let dir = path
        .parent()
        .ok_or_else(|| StorageError::InvalidKey(path.display().to_string()))?;
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    async fn put(&self, key: &str, _content_type: &str, body: Bytes) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&target, &body))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))??;

        info!("Wrote upload to {}", path.display());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn backend(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_creates_nested_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalUploadStore::new(dir.path());

        store
            .put("profile_pics/a_me.png", "image/png", Bytes::from_static(b"\x89PNG"))
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("profile_pics/a_me.png")).unwrap();
        assert_eq!(written, b"\x89PNG");
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalUploadStore::new(dir.path());

        store.put("p/x.png", "image/png", Bytes::from_static(b"one")).await.unwrap();
        store.put("p/x.png", "image/png", Bytes::from_static(b"two")).await.unwrap();

        assert_eq!(std::fs::read(dir.path().join("p/x.png")).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalUploadStore::new(dir.path());

        store.put("p/x.png", "image/png", Bytes::from_static(b"x")).await.unwrap();
        store.delete("p/x.png").await.unwrap();
        assert!(!dir.path().join("p/x.png").exists());
        store.delete("p/x.png").await.unwrap();
    }

    #[tokio::test]
    async fn test_traversal_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalUploadStore::new(dir.path().join("uploads"));
        let err = store
            .put("../escape.png", "image/png", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }
}
