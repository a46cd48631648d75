use crate::keys::validate_key;
use crate::traits::{BlobStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// Process-local blob store, mainly for tests and one-shot CLI runs
#[derive(Default)]
pub struct InMemoryStorage {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type recorded by the last `put` for `key`
    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.content_type.clone())
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryStorage {
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        validate_key(key)?;
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        validate_key(key)?;
        tracing::debug!(key = %key, size_bytes = data.len(), "In-memory storage upload");
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        Ok(self.objects.read().await.contains_key(key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let storage = InMemoryStorage::new();
        assert!(storage.is_empty().await);

        storage
            .put("images/a.webp", Bytes::from_static(b"abc"), "image/webp")
            .await
            .unwrap();

        assert_eq!(storage.len().await, 1);
        assert_eq!(
            storage.get("images/a.webp").await.unwrap(),
            Bytes::from_static(b"abc")
        );
        assert_eq!(
            storage.content_type("images/a.webp").await.as_deref(),
            Some("image/webp")
        );

        storage.delete("images/a.webp").await.unwrap();
        assert!(!storage.exists("images/a.webp").await.unwrap());
        assert!(matches!(
            storage.get("images/a.webp").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let storage = InMemoryStorage::new();
        let result = storage
            .put("../escape", Bytes::from_static(b"x"), "image/png")
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
