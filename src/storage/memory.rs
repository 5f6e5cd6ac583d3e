use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use axum::body::Bytes;
use tokio::sync::RwLock;

use super::{ObjectStorage, StorageError, join_url, validate_path};

/// Keeps objects in a map. Nothing is persisted.
#[derive(Clone)]
pub struct MemoryObjectStorage {
    objects: Arc<RwLock<HashMap<String, (Bytes, String)>>>,
    public_base_url: String,
}

impl MemoryObjectStorage {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            public_base_url: public_base_url.into(),
        }
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.objects.read().await.contains_key(path)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

impl Default for MemoryObjectStorage {
    fn default() -> Self {
        Self::new("memory://media")
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn put(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        validate_path(path)?;
        let mut objects = self.objects.write().await;
        if objects.contains_key(path) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        objects.insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        validate_path(path)?;
        self.objects.write().await.remove(path);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        join_url(&self.public_base_url, path)
    }
}
