//! In-memory object store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::sync::RwLock;

use filehub_core::error::StorageError;
use filehub_core::traits::storage::{ByteStream, ObjectStore, PresignedUrl, StorageResult};

use crate::keys::validate_key;

const BACKEND: &str = "memory";

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    public: bool,
}

/// Object store that keeps every object in a map.
///
/// An optional latency is applied to each `put`, which lets tests exercise
/// deadlines.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
    put_latency: Option<Duration>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `put` by `latency`.
    pub fn with_put_latency(mut self, latency: Duration) -> Self {
        self.put_latency = Some(latency);
        self
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Content type and visibility of a stored object.
    pub async fn describe(&self, key: &str) -> Option<(String, bool)> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| (o.content_type.clone(), o.public))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn issues_signed_urls(&self) -> bool {
        false
    }

    async fn health_check(&self) -> StorageResult<bool> {
        Ok(true)
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String> {
        validate_key(BACKEND, key)?;
        if let Some(latency) = self.put_latency {
            tokio::time::sleep(latency).await;
        }
        let mut objects = self.objects.write().await;
        let public = objects.get(key).is_some_and(|o| o.public);
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                public,
            },
        );
        Ok(format!("memory://{key}"))
    }

    async fn get(&self, key: &str) -> StorageResult<ByteStream> {
        validate_key(BACKEND, key)?;
        let data = self
            .objects
            .read()
            .await
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound {
                backend: BACKEND,
                key: key.to_string(),
            })?;
        Ok(Box::pin(futures::stream::once(async move { Ok(data) })))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(BACKEND, key)?;
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(BACKEND, key)?;
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn presign(&self, key: &str, ttl: Duration) -> StorageResult<PresignedUrl> {
        validate_key(BACKEND, key)?;
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StorageError::backend(BACKEND, key, "presign", e))?;
        Ok(PresignedUrl {
            url: format!("memory://{key}"),
            expires_at: Utc::now() + ttl,
        })
    }

    async fn set_visibility(&self, key: &str, public: bool) -> StorageResult<()> {
        validate_key(BACKEND, key)?;
        match self.objects.write().await.get_mut(key) {
            Some(object) => {
                object.public = public;
                Ok(())
            }
            None => Err(StorageError::NotFound {
                backend: BACKEND,
                key: key.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_visibility_survives_overwrite() {
        let store = MemoryObjectStore::new();
        store.put("o/a", Bytes::from("1"), "text/plain").await.unwrap();
        store.set_visibility("o/a", true).await.unwrap();
        store.put("o/a", Bytes::from("2"), "text/csv").await.unwrap();
        assert_eq!(store.describe("o/a").await, Some(("text/csv".into(), true)));
    }

    #[tokio::test]
    async fn test_set_visibility_on_missing_object() {
        let store = MemoryObjectStore::new();
        let err = store.set_visibility("o/none", true).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
