//! Trash service.
//!
//! Each subtree change is a single store call, so a failure leaves the tree
//! as it was. Storage objects are removed only after the metadata purge has
//! committed; failures there are logged and reported, never rolled back.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use filehub_core::config::TrashConfig;
use filehub_core::error::AppError;
use filehub_core::events::{DomainEvent, EventOutcome, EventPayload, TrashEvent};
use filehub_core::result::AppResult;
use filehub_core::types::pagination::PageRequest;
use filehub_database::store::{PurgedRecords, SubtreeChange, TrashListing};
use filehub_storage::StorageManager;

use crate::context::RequestContext;
use crate::stores::Stores;

/// Result of a purge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// Folder records deleted.
    pub folders: u64,
    /// File records deleted.
    pub files: u64,
    /// Objects deleted from storage.
    pub objects_deleted: u64,
    /// Objects left behind because the backend refused to delete them.
    pub orphaned_objects: u64,
}

impl PurgeReport {
    /// Whether nothing was purged.
    pub fn is_empty(&self) -> bool {
        self.folders == 0 && self.files == 0
    }
}

/// Moves items to the trash and back, and purges them for good.
#[derive(Debug, Clone)]
pub struct TrashService {
    stores: Stores,
    storage: StorageManager,
    config: TrashConfig,
}

impl TrashService {
    /// Creates a new trash service.
    pub fn new(stores: Stores, storage: StorageManager, config: TrashConfig) -> Self {
        Self {
            stores,
            storage,
            config,
        }
    }

    /// Trash operations are reserved to the owner; a collaborator gets
    /// Forbidden rather than NotFound.
    async fn require_file_owner(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<Uuid> {
        let user_id = ctx.require_user()?;
        match self.stores.files.find_by_id(file_id).await? {
            Some(file) if file.owner_id != user_id => {
                Err(AppError::forbidden("Only the owner can trash or restore this file"))
            }
            Some(_) => Ok(user_id),
            None => Err(AppError::not_found(format!("File {file_id} not found"))),
        }
    }

    async fn require_folder_owner(&self, ctx: &RequestContext, folder_id: Uuid) -> AppResult<Uuid> {
        let user_id = ctx.require_user()?;
        match self.stores.folders.find_by_id(folder_id).await? {
            Some(folder) if folder.owner_id != user_id => {
                Err(AppError::forbidden("Only the owner can trash or restore this folder"))
            }
            Some(_) => Ok(user_id),
            None => Err(AppError::not_found(format!("Folder {folder_id} not found"))),
        }
    }

    fn emit(ctx: &RequestContext, event: TrashEvent) {
        DomainEvent::new(ctx.user_id(), EventPayload::Trash(event)).emit();
    }

    /// Move a file to the trash. Trashing it again changes nothing.
    pub async fn trash_file(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<u64> {
        let owner_id = self.require_file_owner(ctx, file_id).await?;
        let changed = self.stores.trash.trash_file(owner_id, file_id, Utc::now()).await?;

        info!(user_id = %owner_id, file_id = %file_id, changed, "File trashed");
        Self::emit(
            ctx,
            TrashEvent::Trashed {
                resource_id: file_id,
                folders: 0,
                files: changed,
            },
        );
        Ok(changed)
    }

    /// Move a folder and everything below it to the trash.
    pub async fn trash_folder(&self, ctx: &RequestContext, folder_id: Uuid) -> AppResult<SubtreeChange> {
        let owner_id = self.require_folder_owner(ctx, folder_id).await?;
        let change = self
            .stores
            .trash
            .trash_folder(owner_id, folder_id, Utc::now())
            .await?;

        info!(
            user_id = %owner_id,
            folder_id = %folder_id,
            folders = change.folders,
            files = change.files,
            "Folder trashed"
        );
        Self::emit(
            ctx,
            TrashEvent::Trashed {
                resource_id: folder_id,
                folders: change.folders,
                files: change.files,
            },
        );
        Ok(change)
    }

    /// Bring a trashed file back.
    pub async fn restore_file(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<u64> {
        let owner_id = self.require_file_owner(ctx, file_id).await?;
        let changed = self.stores.trash.restore_file(owner_id, file_id).await?;

        info!(user_id = %owner_id, file_id = %file_id, "File restored");
        Self::emit(
            ctx,
            TrashEvent::Restored {
                resource_id: file_id,
                folders: 0,
                files: changed,
            },
        );
        Ok(changed)
    }

    /// Bring back a trashed folder with everything trashed together with it.
    pub async fn restore_folder(&self, ctx: &RequestContext, folder_id: Uuid) -> AppResult<SubtreeChange> {
        let owner_id = self.require_folder_owner(ctx, folder_id).await?;
        let change = self.stores.trash.restore_folder(owner_id, folder_id).await?;

        info!(
            user_id = %owner_id,
            folder_id = %folder_id,
            folders = change.folders,
            files = change.files,
            "Folder restored"
        );
        Self::emit(
            ctx,
            TrashEvent::Restored {
                resource_id: folder_id,
                folders: change.folders,
                files: change.files,
            },
        );
        Ok(change)
    }

    /// The caller's trash, newest first.
    pub async fn list_trash(&self, ctx: &RequestContext, page: PageRequest) -> AppResult<TrashListing> {
        let user_id = ctx.require_user()?;
        self.stores.trash.list_trashed(user_id, &page).await
    }

    /// Permanently delete a trashed file.
    pub async fn purge_file(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<PurgeReport> {
        let owner_id = self.require_file_owner(ctx, file_id).await?;
        let purged = self.stores.trash.purge_file(owner_id, file_id).await?;
        Ok(self.finish_purge(ctx.user_id(), Some(file_id), purged).await)
    }

    /// Permanently delete a trashed folder and its subtree.
    pub async fn purge_folder(&self, ctx: &RequestContext, folder_id: Uuid) -> AppResult<PurgeReport> {
        let owner_id = self.require_folder_owner(ctx, folder_id).await?;
        let purged = self.stores.trash.purge_folder(owner_id, folder_id).await?;
        Ok(self.finish_purge(ctx.user_id(), Some(folder_id), purged).await)
    }

    /// Permanently delete everything in the caller's trash.
    pub async fn empty_trash(&self, ctx: &RequestContext) -> AppResult<PurgeReport> {
        let user_id = ctx.require_user()?;
        let purged = self.stores.trash.purge_all(user_id).await?;
        Ok(self.finish_purge(Some(user_id), None, purged).await)
    }

    /// Purge every item trashed longer than the retention period before `now`.
    pub async fn sweep_expired_trash(&self, now: DateTime<Utc>) -> AppResult<PurgeReport> {
        let cutoff = now - Duration::days(i64::from(self.config.retention_days));
        let purged = self.stores.trash.purge_trashed_before(cutoff).await?;
        let report = self.finish_purge(None, None, purged).await;
        if !report.is_empty() {
            info!(
                cutoff = %cutoff,
                folders = report.folders,
                files = report.files,
                "Expired trash swept"
            );
        }
        Ok(report)
    }

    async fn finish_purge(
        &self,
        actor_id: Option<Uuid>,
        resource_id: Option<Uuid>,
        purged: PurgedRecords,
    ) -> PurgeReport {
        let attempted = purged.storage_keys.len() as u64;
        let failed = self.storage.delete_orphans(&purged.storage_keys).await as u64;
        let report = PurgeReport {
            folders: purged.folders,
            files: purged.files,
            objects_deleted: attempted - failed,
            orphaned_objects: failed,
        };

        let outcome = if failed > 0 {
            warn!(
                resource_id = ?resource_id,
                orphaned = failed,
                "Purge left storage objects behind"
            );
            EventOutcome::Failed(format!("{failed} storage objects could not be deleted"))
        } else {
            EventOutcome::Success
        };
        if !report.is_empty() {
            DomainEvent::new(
                actor_id,
                EventPayload::Trash(TrashEvent::Purged {
                    resource_id,
                    folders: report.folders,
                    files: report.files,
                    orphaned_objects: failed,
                }),
            )
            .with_outcome(outcome)
            .emit();
        }
        report
    }
}
