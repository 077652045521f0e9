//! Object store trait for pluggable storage backends.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::StorageError;

/// A byte stream type used for reading object contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Result alias for object store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A time-bounded download location.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PresignedUrl {
    /// The URL (or direct path for backends that cannot sign).
    pub url: String,
    /// When the URL stops being valid.
    pub expires_at: DateTime<Utc>,
}

/// Uniform interface over a storage backend.
///
/// Keys are opaque, owner-namespaced strings produced by the storage crate;
/// implementations never derive paths from user-supplied names.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug + 'static {
    /// Backend name used in logs and errors (e.g. `"local"`, `"s3"`).
    fn backend_name(&self) -> &'static str;

    /// Whether [`presign`](Self::presign) yields URLs the backend validates
    /// on its own. When `false` callers stream bytes instead.
    fn issues_signed_urls(&self) -> bool;

    /// Check whether the backend is reachable.
    async fn health_check(&self) -> StorageResult<bool>;

    /// Store `data` under `key`, overwriting any previous object.
    /// Returns a backend locator for the object.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String>;

    /// Stream the object stored under `key`.
    async fn get(&self, key: &str) -> StorageResult<ByteStream>;

    /// Delete the object. Deleting a missing object succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Produce a time-bounded download URL.
    async fn presign(&self, key: &str, ttl: Duration) -> StorageResult<PresignedUrl>;

    /// Toggle public readability of an object.
    async fn set_visibility(&self, key: &str, public: bool) -> StorageResult<()>;
}
