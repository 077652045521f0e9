//! Trash retention and collaborator expiry handlers.

use async_trait::async_trait;
use serde_json::Value;

use filehub_service::permission::CollaboratorService;
use filehub_service::trash::TrashService;

use crate::executor::{JobExecutionError, JobHandler, JobRun};

/// Purges items that have sat in the trash past the retention period.
#[derive(Debug, Clone)]
pub struct TrashSweepHandler {
    trash: TrashService,
}

impl TrashSweepHandler {
    /// Job type name.
    pub const JOB_TYPE: &'static str = "trash_sweep";

    /// Create a new trash sweep handler
    pub fn new(trash: TrashService) -> Self {
        Self { trash }
    }
}

#[async_trait]
impl JobHandler for TrashSweepHandler {
    fn job_type(&self) -> &str {
        Self::JOB_TYPE
    }

    async fn execute(&self, run: &JobRun) -> Result<Option<Value>, JobExecutionError> {
        let report = self
            .trash
            .sweep_expired_trash(run.triggered_at)
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Trash sweep failed: {e}")))?;

        tracing::info!(
            run_id = %run.id,
            folders = report.folders,
            files = report.files,
            orphaned_objects = report.orphaned_objects,
            "Trash sweep finished"
        );
        Ok(Some(serde_json::json!({
            "task": Self::JOB_TYPE,
            "folders_purged": report.folders,
            "files_purged": report.files,
            "orphaned_objects": report.orphaned_objects,
        })))
    }
}

/// Deletes collaborator grants past their expiry.
#[derive(Debug, Clone)]
pub struct CollaboratorSweepHandler {
    collaborators: CollaboratorService,
}

impl CollaboratorSweepHandler {
    /// Job type name.
    pub const JOB_TYPE: &'static str = "collaborator_sweep";

    /// Create a new collaborator sweep handler
    pub fn new(collaborators: CollaboratorService) -> Self {
        Self { collaborators }
    }
}

#[async_trait]
impl JobHandler for CollaboratorSweepHandler {
    fn job_type(&self) -> &str {
        Self::JOB_TYPE
    }

    async fn execute(&self, run: &JobRun) -> Result<Option<Value>, JobExecutionError> {
        let removed = self
            .collaborators
            .sweep_expired(run.triggered_at)
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Grant sweep failed: {e}")))?;

        tracing::info!(run_id = %run.id, removed, "Expired grants removed");
        Ok(Some(serde_json::json!({
            "task": Self::JOB_TYPE,
            "grants_removed": removed,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;
    use filehub_core::config::{SharingConfig, TrashConfig, UploadConfig};
    use filehub_database::MemoryDatabase;
    use filehub_service::{RequestContext, Services, Stores};
    use filehub_storage::{MemoryObjectStore, StorageManager};

    fn services() -> Services {
        let storage = StorageManager::new(
            std::sync::Arc::new(MemoryObjectStore::new()),
            Duration::from_secs(900),
            Duration::from_secs(30),
        );
        Services::new(
            Stores::memory(MemoryDatabase::new()),
            storage,
            SharingConfig::default(),
            UploadConfig::default(),
            TrashConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_trash_sweep_respects_retention() {
        let services = services();
        let owner = uuid::Uuid::new_v4();
        let ctx = RequestContext::user(owner);
        let folder = services
            .folders
            .create_folder(
                &ctx,
                filehub_service::folder::CreateFolderRequest {
                    parent_id: None,
                    name: "old".into(),
                    color: None,
                },
            )
            .await
            .unwrap();
        services.trash.trash_folder(&ctx, folder.id).await.unwrap();

        let handler = TrashSweepHandler::new(services.trash.clone());

        let soon = JobRun::now(TrashSweepHandler::JOB_TYPE);
        let out = handler.execute(&soon).await.unwrap().unwrap();
        assert_eq!(out["folders_purged"], 0);

        let mut later = JobRun::now(TrashSweepHandler::JOB_TYPE);
        later.triggered_at = Utc::now() + chrono::Duration::days(31);
        let out = handler.execute(&later).await.unwrap().unwrap();
        assert_eq!(out["folders_purged"], 1);
    }
}
