//! Local filesystem object store.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

use filehub_core::error::StorageError;
use filehub_core::traits::storage::{ByteStream, ObjectStore, PresignedUrl, StorageResult};

use crate::keys::validate_key;

const BACKEND: &str = "local";

/// Object store backed by a directory tree.
///
/// Presigning is not supported; [`ObjectStore::presign`] returns the object's
/// path on disk and callers stream the bytes themselves.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at `root_path`, creating the directory if needed.
    pub async fn new(root_path: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::backend(BACKEND, root.display().to_string(), "init", e)
        })?;
        Ok(Self { root })
    }

    fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(BACKEND, key)?;
        Ok(self.root.join(key))
    }
}

fn io_error(key: &str, operation: &'static str, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound {
            backend: BACKEND,
            key: key.to_string(),
        }
    } else {
        StorageError::backend(BACKEND, key, operation, e)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn issues_signed_urls(&self) -> bool {
        false
    }

    async fn health_check(&self) -> StorageResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::backend(BACKEND, key, "put", e))?;
        }

        // Write beside the target and rename so readers never see a partial object.
        let staging = path.with_file_name(format!(".{}.part", Uuid::new_v4()));
        fs::write(&staging, &data)
            .await
            .map_err(|e| StorageError::backend(BACKEND, key, "put", e))?;
        if let Err(e) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(StorageError::backend(BACKEND, key, "put", e));
        }

        debug!(key, bytes = data.len(), content_type, "Stored object on local disk");
        Ok(path.display().to_string())
    }

    async fn get(&self, key: &str) -> StorageResult<ByteStream> {
        let path = self.resolve(key)?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| io_error(key, "get", e))?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::backend(BACKEND, key, "delete", e)),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.resolve(key)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| StorageError::backend(BACKEND, key, "exists", e))
    }

    async fn presign(&self, key: &str, ttl: Duration) -> StorageResult<PresignedUrl> {
        let path = self.resolve(key)?;
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StorageError::backend(BACKEND, key, "presign", e))?;
        Ok(PresignedUrl {
            url: path.display().to_string(),
            expires_at: Utc::now() + ttl,
        })
    }

    async fn set_visibility(&self, key: &str, public: bool) -> StorageResult<()> {
        self.resolve(key)?;
        debug!(key, public, "Local store has no object ACLs; visibility unchanged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::StreamExt;

    async fn read_all(mut stream: ByteStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path()).await.unwrap();

        store
            .put("owner/obj.txt", Bytes::from("hello world"), "text/plain")
            .await
            .unwrap();
        assert!(store.exists("owner/obj.txt").await.unwrap());
        assert_eq!(read_all(store.get("owner/obj.txt").await.unwrap()).await, b"hello world");

        store.delete("owner/obj.txt").await.unwrap();
        assert!(!store.exists("owner/obj.txt").await.unwrap());
        // Deleting again is still fine.
        store.delete("owner/obj.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path()).await.unwrap();

        store.put("o/k", Bytes::from("one"), "text/plain").await.unwrap();
        store.put("o/k", Bytes::from("two"), "text/plain").await.unwrap();
        assert_eq!(read_all(store.get("o/k").await.unwrap()).await, b"two");
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path()).await.unwrap();

        let err = match store.get("o/missing").await {
            Err(e) => e,
            Ok(_) => panic!("expected NotFound"),
        };
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_traversal_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path()).await.unwrap();

        let err = store
            .put("../escape", Bytes::from("x"), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey { .. }));
    }

    #[tokio::test]
    async fn test_presign_degrades_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path()).await.unwrap();

        assert!(!store.issues_signed_urls());
        let url = store.presign("o/k.bin", Duration::from_secs(60)).await.unwrap();
        assert!(url.url.ends_with("k.bin"));
        assert!(url.expires_at > Utc::now());
    }
}
