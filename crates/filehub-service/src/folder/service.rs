//! Folder CRUD operations with permission checks.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use filehub_core::error::AppError;
use filehub_core::events::{DomainEvent, EventPayload, FileEvent};
use filehub_core::result::AppResult;
use filehub_core::types::pagination::{PageRequest, PageResponse};
use filehub_entity::folder::{CreateFolder, Folder, path};
use filehub_entity::permission::CollaboratorRole;

use crate::context::RequestContext;
use crate::permission::PermissionService;
use crate::stores::Stores;

/// Request to create a folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolderRequest {
    /// Parent folder (None = the caller's root).
    pub parent_id: Option<Uuid>,
    /// Folder name.
    pub name: String,
    /// Optional `#rrggbb` color tag.
    pub color: Option<String>,
}

/// Request to move a folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveFolderRequest {
    /// New parent (None = root).
    pub new_parent_id: Option<Uuid>,
}

/// Manages the folder tree.
#[derive(Debug, Clone)]
pub struct FolderService {
    stores: Stores,
    permissions: PermissionService,
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(stores: Stores, permissions: PermissionService) -> Self {
        Self { stores, permissions }
    }

    /// A folder that may receive new children: it exists, is not in the
    /// trash and the caller can edit it.
    pub(crate) async fn writable_destination(
        stores: &Stores,
        permissions: &PermissionService,
        ctx: &RequestContext,
        folder_id: Uuid,
    ) -> AppResult<Folder> {
        let folder = stores
            .folders
            .find_by_id(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))?;
        if folder.is_trashed {
            return Err(AppError::conflict("Destination folder is in the trash"));
        }
        permissions
            .require_folder(ctx, &folder, CollaboratorRole::Editor)
            .await?;
        Ok(folder)
    }

    async fn ensure_name_free(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
        except: Option<Uuid>,
    ) -> AppResult<()> {
        let existing = self
            .stores
            .folders
            .find_active_sibling(owner_id, parent_id, name)
            .await?;
        match existing {
            Some(f) if Some(f.id) != except => Err(AppError::conflict(format!(
                "A folder named '{name}' already exists here"
            ))),
            _ => Ok(()),
        }
    }

    /// Create a folder. Inside another user's folder the new folder belongs
    /// to that folder's owner.
    pub async fn create_folder(&self, ctx: &RequestContext, req: CreateFolderRequest) -> AppResult<Folder> {
        let user_id = ctx.require_user()?;
        let name = path::validate_name(&req.name)?.to_string();
        if let Some(color) = &req.color {
            path::validate_color(color)?;
        }

        let (owner_id, parent_path) = match req.parent_id {
            Some(parent_id) => {
                let parent =
                    Self::writable_destination(&self.stores, &self.permissions, ctx, parent_id).await?;
                (parent.owner_id, Some(parent.path))
            }
            None => (user_id, None),
        };
        self.ensure_name_free(owner_id, req.parent_id, &name, None).await?;

        let folder = self
            .stores
            .folders
            .create(&CreateFolder {
                owner_id,
                parent_id: req.parent_id,
                path: path::child_path(parent_path.as_deref(), &name),
                name,
                color: req.color,
            })
            .await?;

        info!(user_id = %user_id, folder_id = %folder.id, path = %folder.path, "Folder created");
        DomainEvent::new(
            Some(user_id),
            EventPayload::File(FileEvent::FolderCreated {
                folder_id: folder.id,
                path: folder.path.clone(),
            }),
        )
        .emit();
        Ok(folder)
    }

    /// Get a folder the caller can view.
    pub async fn get_folder(&self, ctx: &RequestContext, folder_id: Uuid) -> AppResult<Folder> {
        Ok(self
            .permissions
            .load_folder(ctx, folder_id, CollaboratorRole::Viewer)
            .await?
            .0)
    }

    /// Live child folders of `parent_id`, or the caller's root folders.
    pub async fn list_children(
        &self,
        ctx: &RequestContext,
        parent_id: Option<Uuid>,
        page: PageRequest,
    ) -> AppResult<PageResponse<Folder>> {
        let owner_id = match parent_id {
            Some(id) => self.get_folder(ctx, id).await?.owner_id,
            None => ctx.require_user()?,
        };
        self.stores
            .folders
            .list_children(owner_id, parent_id, &page)
            .await
    }

    /// The folders from the root down to `folder_id`.
    pub async fn breadcrumbs(&self, ctx: &RequestContext, folder_id: Uuid) -> AppResult<Vec<Folder>> {
        let folder = self.get_folder(ctx, folder_id).await?;
        self.stores.folders.find_ancestors(folder.id).await
    }

    async fn relocate(
        &self,
        ctx: &RequestContext,
        folder: Folder,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Folder> {
        let updated = self
            .stores
            .folders
            .relocate(folder.id, parent_id, name)
            .await?;

        info!(
            user_id = ?ctx.user_id(),
            folder_id = %folder.id,
            old_path = %folder.path,
            new_path = %updated.path,
            "Folder relocated"
        );
        DomainEvent::new(
            ctx.user_id(),
            EventPayload::File(FileEvent::FolderRelocated {
                folder_id: folder.id,
                old_path: folder.path,
                new_path: updated.path.clone(),
            }),
        )
        .emit();
        Ok(updated)
    }

    /// Rename a folder; descendant paths follow.
    pub async fn rename_folder(&self, ctx: &RequestContext, folder_id: Uuid, name: &str) -> AppResult<Folder> {
        let (folder, _) = self
            .permissions
            .load_folder(ctx, folder_id, CollaboratorRole::Editor)
            .await?;
        let name = path::validate_name(name)?;
        if name == folder.name {
            return Ok(folder);
        }
        self.ensure_name_free(folder.owner_id, folder.parent_id, name, Some(folder.id))
            .await?;

        let parent_id = folder.parent_id;
        self.relocate(ctx, folder, parent_id, name).await
    }

    /// Move a folder under a new parent. Moving a folder into itself or
    /// any of its descendants is a conflict and changes nothing.
    pub async fn move_folder(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
        req: MoveFolderRequest,
    ) -> AppResult<Folder> {
        let (folder, _) = self
            .permissions
            .load_folder(ctx, folder_id, CollaboratorRole::Editor)
            .await?;
        if folder.parent_id == req.new_parent_id {
            return Ok(folder);
        }

        match req.new_parent_id {
            Some(dest_id) => {
                if dest_id == folder.id {
                    return Err(AppError::conflict("Cannot move a folder into itself"));
                }
                let dest =
                    Self::writable_destination(&self.stores, &self.permissions, ctx, dest_id).await?;
                if folder.contains(&dest) {
                    return Err(AppError::conflict(
                        "Cannot move a folder into one of its descendants",
                    ));
                }
                if dest.owner_id != folder.owner_id {
                    return Err(AppError::validation(
                        "Folders can only be moved within one owner's tree",
                    ));
                }
            }
            None => {
                if ctx.user_id() != Some(folder.owner_id) {
                    return Err(AppError::forbidden(
                        "Only the owner can move a folder to the root",
                    ));
                }
            }
        }

        self.ensure_name_free(folder.owner_id, req.new_parent_id, &folder.name, Some(folder.id))
            .await?;
        let name = folder.name.clone();
        self.relocate(ctx, folder, req.new_parent_id, &name).await
    }

    /// Set or clear the color tag.
    pub async fn set_color(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
        color: Option<&str>,
    ) -> AppResult<Folder> {
        let (folder, _) = self
            .permissions
            .load_folder(ctx, folder_id, CollaboratorRole::Editor)
            .await?;
        if let Some(color) = color {
            path::validate_color(color)?;
        }
        self.stores.folders.set_color(folder.id, color).await
    }
}
