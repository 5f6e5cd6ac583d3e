use std::{io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use axum::body::Bytes;
use tokio::{fs, io::AsyncWriteExt};

use super::{ObjectStorage, StorageError, join_url, validate_path};

/// Stores objects as files under a root directory.
///
/// The root is served by the HTTP router at the path of `public_base_url`.
pub struct LocalObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    fn file_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put(&self, path: &str, bytes: Bytes, _content_type: &str) -> Result<(), StorageError> {
        let file_path = self.file_path(path)?;

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Backend(format!("Failed to create directory: {e}")))?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file_path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::AlreadyExists(path.to_string()),
                _ => StorageError::Backend(format!("Failed to create file: {e}")),
            })?;

        file.write_all(&bytes)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to write file: {e}")))?;
        file.flush()
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to flush file: {e}")))?;

        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let file_path = self.file_path(path)?;

        match fs::remove_file(&file_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Backend(format!("Failed to delete file: {e}"))),
        }
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.public_base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_refuses_to_overwrite_and_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalObjectStorage::new(dir.path(), "http://localhost:8080/media");
        let path = "products/BAG-042/images/1700000000000.jpg";

        storage
            .put(path, Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(std::fs::read(dir.path().join(path)).unwrap(), b"jpeg");

        let again = storage
            .put(path, Bytes::from_static(b"other"), "image/jpeg")
            .await;
        assert!(matches!(again, Err(StorageError::AlreadyExists(_))));

        storage.remove(path).await.unwrap();
        storage.remove(path).await.unwrap();
        assert!(!dir.path().join(path).exists());

        assert_eq!(
            storage.public_url(path),
            "http://localhost:8080/media/products/BAG-042/images/1700000000000.jpg"
        );
    }
}
