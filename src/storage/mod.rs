//! Object storage for product media files.

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;

pub mod local;
pub mod memory;

pub use local::LocalObjectStorage;
pub use memory::MemoryObjectStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid object path: {0}")]
    InvalidPath(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` under `path`. Never overwrites an existing object.
    async fn put(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Removes the object at `path`. Removing a missing object succeeds.
    async fn remove(&self, path: &str) -> Result<(), StorageError>;

    /// Public URL under which the object at `path` is served.
    fn public_url(&self, path: &str) -> String;
}

/// Rejects absolute paths and any `.`/`..` segment.
pub fn validate_path(path: &str) -> Result<(), StorageError> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if invalid {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_paths_are_rejected() {
        assert!(validate_path("products/BAG-1/images/1.jpg").is_ok());
        for path in ["", "/etc/passwd", "products/../secret", "products//x", "a\\b", "./x"] {
            assert!(validate_path(path).is_err(), "{path} should be rejected");
        }
    }

    #[test]
    fn urls_are_joined_with_a_single_slash() {
        assert_eq!(join_url("http://cdn/media/", "a/b.jpg"), "http://cdn/media/a/b.jpg");
        assert_eq!(join_url("http://cdn/media", "a/b.jpg"), "http://cdn/media/a/b.jpg");
    }
}
