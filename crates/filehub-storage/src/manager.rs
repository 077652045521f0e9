//! Storage manager: owns the configured backend and applies deadlines.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;
use tracing::{info, warn};

use filehub_core::config::StorageConfig;
use filehub_core::error::AppError;
use filehub_core::result::AppResult;
use filehub_core::traits::storage::{ByteStream, ObjectStore, PresignedUrl, StorageResult};

use crate::deadline::within;
use crate::providers::LocalObjectStore;

/// Holds the active [`ObjectStore`] and the timing policy around it.
///
/// Every call goes through [`within`], bounded by the earlier of the
/// caller's deadline and the configured per-operation timeout.
#[derive(Debug, Clone)]
pub struct StorageManager {
    store: Arc<dyn ObjectStore>,
    presign_ttl: Duration,
    operation_timeout: Duration,
}

impl StorageManager {
    /// Wrap an existing store.
    pub fn new(store: Arc<dyn ObjectStore>, presign_ttl: Duration, operation_timeout: Duration) -> Self {
        Self {
            store,
            presign_ttl,
            operation_timeout,
        }
    }

    /// Build the backend selected by `storage.driver`.
    pub async fn from_config(config: &StorageConfig) -> AppResult<Self> {
        let store: Arc<dyn ObjectStore> = match config.driver.as_str() {
            "local" => Arc::new(LocalObjectStore::new(&config.local.root_path).await?),
            #[cfg(feature = "s3")]
            "s3" => Arc::new(crate::providers::S3ObjectStore::new(&config.s3).await?),
            #[cfg(not(feature = "s3"))]
            "s3" => {
                return Err(AppError::configuration(
                    "storage.driver = \"s3\" requires the `s3` feature",
                ));
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown storage driver '{other}'"
                )));
            }
        };
        info!(
            driver = store.backend_name(),
            presign_ttl_seconds = config.presign_ttl_seconds,
            "Object store ready"
        );
        Ok(Self::new(
            store,
            Duration::from_secs(config.presign_ttl_seconds),
            Duration::from_secs(config.operation_timeout_seconds),
        ))
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Lifetime of issued download URLs.
    pub fn presign_ttl(&self) -> Duration {
        self.presign_ttl
    }

    /// Whether downloads are served as redirects to signed URLs.
    pub fn issues_signed_urls(&self) -> bool {
        self.store.issues_signed_urls()
    }

    fn deadline(&self, caller: Option<Instant>) -> Instant {
        let own = Instant::now() + self.operation_timeout;
        caller.map_or(own, |d| d.min(own))
    }

    /// Store an object.
    pub async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        deadline: Option<Instant>,
    ) -> StorageResult<String> {
        let backend = self.store.backend_name();
        within(
            Some(self.deadline(deadline)),
            backend,
            key,
            "put",
            self.store.put(key, data, content_type),
        )
        .await
    }

    /// Open an object for streaming.
    pub async fn get(&self, key: &str, deadline: Option<Instant>) -> StorageResult<ByteStream> {
        let backend = self.store.backend_name();
        within(Some(self.deadline(deadline)), backend, key, "get", self.store.get(key)).await
    }

    /// Issue a download URL valid for the configured TTL.
    pub async fn presign(&self, key: &str, deadline: Option<Instant>) -> StorageResult<PresignedUrl> {
        let backend = self.store.backend_name();
        within(
            Some(self.deadline(deadline)),
            backend,
            key,
            "presign",
            self.store.presign(key, self.presign_ttl),
        )
        .await
    }

    /// Delete an object.
    pub async fn delete(&self, key: &str, deadline: Option<Instant>) -> StorageResult<()> {
        let backend = self.store.backend_name();
        within(Some(self.deadline(deadline)), backend, key, "delete", self.store.delete(key)).await
    }

    /// Change object visibility, logging instead of failing.
    pub async fn set_visibility_best_effort(&self, key: &str, public: bool, deadline: Option<Instant>) {
        let backend = self.store.backend_name();
        let result = within(
            Some(self.deadline(deadline)),
            backend,
            key,
            "set_visibility",
            self.store.set_visibility(key, public),
        )
        .await;
        if let Err(e) = result {
            warn!(key, public, error = %e, "Failed to update object visibility");
        }
    }

    /// Delete objects after their metadata is gone. Failures are logged and
    /// counted; the returned number is how many objects could not be removed.
    pub async fn delete_orphans(&self, keys: &[String]) -> usize {
        let mut failed = 0;
        for key in keys {
            if let Err(e) = self.delete(key, None).await {
                failed += 1;
                warn!(key = %key, error = %e, "Failed to delete purged object; left orphaned");
            }
        }
        failed
    }

    /// Check backend reachability.
    pub async fn health_check(&self) -> bool {
        self.store.health_check().await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryObjectStore;

    #[tokio::test(start_paused = true)]
    async fn test_caller_deadline_bounds_put() {
        let store = MemoryObjectStore::new().with_put_latency(Duration::from_secs(10));
        let manager = StorageManager::new(
            Arc::new(store.clone()),
            Duration::from_secs(60),
            Duration::from_secs(30),
        );

        let deadline = Instant::now() + Duration::from_secs(1);
        let err = manager
            .put("o/k", Bytes::from("x"), "text/plain", Some(deadline))
            .await
            .unwrap_err();
        assert!(matches!(err, filehub_core::StorageError::Timeout { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_orphans_counts_failures() {
        let manager = StorageManager::new(
            Arc::new(MemoryObjectStore::new()),
            Duration::from_secs(60),
            Duration::from_secs(30),
        );
        let failed = manager
            .delete_orphans(&["o/a".to_string(), "../bad".to_string()])
            .await;
        assert_eq!(failed, 1);
    }

    #[tokio::test]
    async fn test_unknown_driver_is_configuration_error() {
        let config = StorageConfig {
            driver: "ftp".into(),
            ..StorageConfig::default()
        };
        let err = StorageManager::from_config(&config).await.unwrap_err();
        assert!(err.is(filehub_core::ErrorKind::Configuration));
    }
}
