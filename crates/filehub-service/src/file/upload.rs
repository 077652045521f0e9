//! File uploads: single files and bounded parallel batches.
//!
//! Bytes are written before metadata. If the metadata insert fails the
//! object is deleted again, so no file record ever points at a missing
//! object.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use filehub_core::config::UploadConfig;
use filehub_core::error::AppError;
use filehub_core::events::{DomainEvent, EventOutcome, EventPayload, FileEvent};
use filehub_core::result::AppResult;
use filehub_entity::file::{CreateFile, File};
use filehub_storage::{StorageManager, object_key};

use crate::context::RequestContext;
use crate::folder::FolderService;
use crate::permission::PermissionService;
use crate::stores::Stores;

/// Longest accepted file name.
const MAX_FILE_NAME_LEN: usize = 255;

/// Validate a file name and return it trimmed.
pub(crate) fn validate_file_name(name: &str) -> AppResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("File name must not be empty"));
    }
    if name.chars().count() > MAX_FILE_NAME_LEN {
        return Err(AppError::validation(format!(
            "File name exceeds {MAX_FILE_NAME_LEN} characters"
        )));
    }
    if name.contains('/') || name.contains('\\') || name.chars().any(char::is_control) {
        return Err(AppError::validation(format!("Invalid file name '{name}'")));
    }
    Ok(name)
}

/// One file to upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Destination folder (None = the caller's root).
    pub folder_id: Option<Uuid>,
    /// File name.
    pub name: String,
    /// MIME type; guessed as `application/octet-stream` when absent.
    pub content_type: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Make the file public right away.
    pub is_public: bool,
    /// File contents.
    pub data: Bytes,
}

/// Outcome of a batch upload.
#[derive(Debug, Default)]
pub struct BatchUploadReport {
    /// Files stored.
    pub uploaded: Vec<File>,
    /// Files that failed, by name.
    pub failed: Vec<(String, AppError)>,
}

/// Stores uploaded bytes and registers their metadata.
#[derive(Debug, Clone)]
pub struct UploadService {
    stores: Stores,
    permissions: PermissionService,
    storage: StorageManager,
    config: UploadConfig,
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(
        stores: Stores,
        permissions: PermissionService,
        storage: StorageManager,
        config: UploadConfig,
    ) -> Self {
        Self {
            stores,
            permissions,
            storage,
            config,
        }
    }

    /// Upload one file.
    pub async fn upload(&self, ctx: &RequestContext, req: UploadRequest) -> AppResult<File> {
        let user_id = ctx.require_user()?;
        let name = validate_file_name(&req.name)?.to_string();
        if req.data.len() as u64 > self.config.max_file_size_bytes {
            return Err(AppError::validation(format!(
                "File exceeds maximum upload size of {} bytes",
                self.config.max_file_size_bytes
            )));
        }

        let owner_id = match req.folder_id {
            Some(folder_id) => {
                FolderService::writable_destination(&self.stores, &self.permissions, ctx, folder_id)
                    .await?
                    .owner_id
            }
            None => user_id,
        };

        let file_id = Uuid::new_v4();
        let extension = File::extension_of(&name);
        let key = object_key(owner_id, file_id, extension.as_deref());
        let content_type = req
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let size_bytes = req.data.len() as i64;

        if let Err(e) = self
            .storage
            .put(&key, req.data, &content_type, ctx.deadline)
            .await
        {
            // A timed-out put may still land; make sure nothing is left behind.
            self.compensate(&key).await;
            return Err(e.into());
        }
        if req.is_public {
            self.storage
                .set_visibility_best_effort(&key, true, ctx.deadline)
                .await;
        }

        let created = self
            .stores
            .files
            .create(&CreateFile {
                id: file_id,
                owner_id,
                folder_id: req.folder_id,
                name: name.clone(),
                storage_key: key.clone(),
                size_bytes,
                content_type,
                extension,
                description: req.description,
                is_public: req.is_public,
            })
            .await;
        let file = match created {
            Ok(file) => file,
            Err(e) => {
                self.compensate(&key).await;
                DomainEvent::new(
                    Some(user_id),
                    EventPayload::File(FileEvent::Uploaded {
                        file_id,
                        folder_id: req.folder_id,
                        name,
                        size_bytes,
                    }),
                )
                .with_outcome(EventOutcome::Failed(e.message.clone()))
                .emit();
                return Err(e);
            }
        };

        info!(
            user_id = %user_id,
            file_id = %file.id,
            size_bytes,
            "File uploaded"
        );
        DomainEvent::new(
            Some(user_id),
            EventPayload::File(FileEvent::Uploaded {
                file_id: file.id,
                folder_id: file.folder_id,
                name: file.name.clone(),
                size_bytes,
            }),
        )
        .emit();
        Ok(file)
    }

    async fn compensate(&self, key: &str) {
        match self.storage.delete(key, None).await {
            Ok(()) => warn!(key, "Upload rolled back; stored object deleted"),
            Err(e) => error!(key, error = %e, "Upload rollback failed; object left orphaned"),
        }
    }

    /// Upload several files concurrently, at most `max_parallel` at a time.
    ///
    /// Every file is attempted; one failure never cancels the others.
    pub async fn upload_batch(
        &self,
        ctx: &RequestContext,
        requests: Vec<UploadRequest>,
    ) -> AppResult<BatchUploadReport> {
        ctx.require_user()?;
        if requests.len() > self.config.max_batch_files {
            return Err(AppError::validation(format!(
                "A batch may contain at most {} files",
                self.config.max_batch_files
            )));
        }

        let limiter = Arc::new(Semaphore::new(self.config.max_parallel.max(1)));
        let mut pending: Vec<String> = requests.iter().map(|r| r.name.clone()).collect();
        let mut tasks = JoinSet::new();
        for req in requests {
            let service = self.clone();
            let ctx = ctx.clone();
            let limiter = Arc::clone(&limiter);
            tasks.spawn(async move {
                let name = req.name.clone();
                let result = match limiter.acquire().await {
                    Ok(_permit) => service.upload(&ctx, req).await,
                    Err(_) => Err(AppError::internal("Upload limiter closed")),
                };
                (name, result)
            });
        }

        let mut report = BatchUploadReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, result)) => {
                    if let Some(pos) = pending.iter().position(|n| *n == name) {
                        pending.swap_remove(pos);
                    }
                    match result {
                        Ok(file) => report.uploaded.push(file),
                        Err(e) => {
                            warn!(file_name = %name, error = %e, "Batch upload item failed");
                            report.failed.push((name, e));
                        }
                    }
                }
                Err(e) => error!(error = %e, "Batch upload task aborted"),
            }
        }
        // Whatever never reported back died with its task.
        for name in pending {
            report
                .failed
                .push((name, AppError::internal("Upload task aborted")));
        }

        info!(
            user_id = ?ctx.user_id(),
            uploaded = report.uploaded.len(),
            failed = report.failed.len(),
            "Batch upload finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_validation() {
        assert_eq!(validate_file_name("  report.pdf ").ok(), Some("report.pdf"));
        assert!(validate_file_name("").is_err());
        assert!(validate_file_name("a/b.txt").is_err());
        assert!(validate_file_name(&"x".repeat(256)).is_err());
    }
}
