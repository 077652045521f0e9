//! Deadline enforcement for object store calls.

use std::future::Future;

use tokio::time::Instant;

use filehub_core::error::StorageError;
use filehub_core::traits::storage::StorageResult;

/// Run `fut`, failing with [`StorageError::Timeout`] once `deadline` passes.
///
/// Without a deadline the future runs to completion.
pub async fn within<T, F>(
    deadline: Option<Instant>,
    backend: &'static str,
    key: &str,
    operation: &'static str,
    fut: F,
) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    let Some(deadline) = deadline else {
        return fut.await;
    };
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(backend, key, operation, "Storage operation hit its deadline");
            Err(StorageError::Timeout {
                backend,
                key: key.to_string(),
                operation,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_deadline_is_timeout() {
        let deadline = Instant::now() + Duration::from_millis(50);
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, StorageError>(())
        };
        let err = within(Some(deadline), "memory", "k", "put", slow)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Timeout { operation: "put", .. }));
    }

    #[tokio::test]
    async fn test_no_deadline_runs_to_completion() {
        let value = within(None, "memory", "k", "get", async { Ok::<_, StorageError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
