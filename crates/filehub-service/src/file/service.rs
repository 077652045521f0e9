//! File metadata operations with permission checks.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use filehub_core::error::AppError;
use filehub_core::events::{DomainEvent, EventPayload, FileEvent};
use filehub_core::result::AppResult;
use filehub_core::types::pagination::{PageRequest, PageResponse};
use filehub_entity::file::{File, UpdateFile};
use filehub_entity::permission::CollaboratorRole;
use filehub_storage::StorageManager;

use super::upload::validate_file_name;
use crate::context::RequestContext;
use crate::folder::FolderService;
use crate::permission::PermissionService;
use crate::stores::Stores;

/// Request to update file metadata. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateFileRequest {
    /// New name.
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    /// Set or clear the description.
    pub description: Option<Option<String>>,
    /// Toggle public readability.
    pub is_public: Option<bool>,
    /// Toggle the star.
    pub is_starred: Option<bool>,
}

/// Reads and edits file metadata.
#[derive(Debug, Clone)]
pub struct FileService {
    stores: Stores,
    permissions: PermissionService,
    storage: StorageManager,
}

impl FileService {
    /// Creates a new file service.
    pub fn new(stores: Stores, permissions: PermissionService, storage: StorageManager) -> Self {
        Self {
            stores,
            permissions,
            storage,
        }
    }

    /// Get a file the caller can view.
    pub async fn get_file(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<File> {
        Ok(self
            .permissions
            .load_file(ctx, file_id, CollaboratorRole::Viewer)
            .await?
            .0)
    }

    /// Live files in a folder, or in the caller's root.
    pub async fn list_files(
        &self,
        ctx: &RequestContext,
        folder_id: Option<Uuid>,
        page: PageRequest,
    ) -> AppResult<PageResponse<File>> {
        let owner_id = match folder_id {
            Some(id) => {
                self.permissions
                    .load_folder(ctx, id, CollaboratorRole::Viewer)
                    .await?
                    .0
                    .owner_id
            }
            None => ctx.require_user()?,
        };
        self.stores
            .files
            .list_in_folder(owner_id, folder_id, &page)
            .await
    }

    /// Update metadata. Changing `is_public` also updates the object's
    /// visibility in storage, best-effort.
    pub async fn update_file(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        req: UpdateFileRequest,
    ) -> AppResult<File> {
        req.validate()
            .map_err(|e| AppError::validation(format!("Invalid file update: {e}")))?;
        let (file, level) = self
            .permissions
            .load_file(ctx, file_id, CollaboratorRole::Editor)
            .await?;
        if req.is_public.is_some() && !level.is_owner() {
            return Err(AppError::forbidden("Only the owner can change file visibility"));
        }
        let name = match req.name {
            Some(name) => Some(validate_file_name(&name)?.to_string()),
            None => None,
        };

        let update = UpdateFile {
            name,
            description: req.description,
            is_public: req.is_public,
            is_starred: req.is_starred,
        };
        let changed_fields = update.changed_fields();
        if changed_fields.is_empty() {
            return Ok(file);
        }
        let updated = self.stores.files.update(file.id, &update).await?;

        if let Some(public) = req.is_public.filter(|p| *p != file.is_public) {
            self.storage
                .set_visibility_best_effort(&updated.storage_key, public, ctx.deadline)
                .await;
        }

        info!(user_id = ?ctx.user_id(), file_id = %file.id, ?changed_fields, "File updated");
        DomainEvent::new(
            ctx.user_id(),
            EventPayload::File(FileEvent::Updated {
                file_id: file.id,
                changed_fields,
            }),
        )
        .emit();
        Ok(updated)
    }

    /// Move a file to another folder (None = root).
    pub async fn move_file(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        folder_id: Option<Uuid>,
    ) -> AppResult<File> {
        let (file, level) = self
            .permissions
            .load_file(ctx, file_id, CollaboratorRole::Editor)
            .await?;
        if file.folder_id == folder_id {
            return Ok(file);
        }
        match folder_id {
            Some(dest_id) => {
                let dest =
                    FolderService::writable_destination(&self.stores, &self.permissions, ctx, dest_id)
                        .await?;
                if dest.owner_id != file.owner_id {
                    return Err(AppError::validation(
                        "Files can only be moved within one owner's tree",
                    ));
                }
            }
            None if !level.is_owner() => {
                return Err(AppError::forbidden("Only the owner can move a file to the root"));
            }
            None => {}
        }

        let moved = self.stores.files.move_to(file.id, folder_id).await?;
        info!(
            user_id = ?ctx.user_id(),
            file_id = %file.id,
            from = ?file.folder_id,
            to = ?folder_id,
            "File moved"
        );
        DomainEvent::new(
            ctx.user_id(),
            EventPayload::File(FileEvent::Moved {
                file_id: file.id,
                from_folder_id: file.folder_id,
                to_folder_id: folder_id,
            }),
        )
        .emit();
        Ok(moved)
    }
}
