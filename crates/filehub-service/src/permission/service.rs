//! Authorization of file and folder operations.
//!
//! Loads the grants that apply to a resource (its own and those of every
//! enclosing folder) and hands them to the pure resolver. Nothing is
//! cached: each check reads the current grants.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use filehub_auth::acl::{self, AccessLevel, ResourceAccess};
use filehub_core::error::AppError;
use filehub_core::result::AppResult;
use filehub_entity::file::File;
use filehub_entity::folder::Folder;
use filehub_entity::permission::{CollaboratorRole, ResourceRef};

use crate::context::RequestContext;
use crate::stores::Stores;

/// Resolves what the caller may do with a file or folder.
#[derive(Debug, Clone)]
pub struct PermissionService {
    stores: Stores,
}

impl PermissionService {
    /// Creates a new permission service.
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// IDs of the folders enclosing `folder_id`, itself included.
    async fn folder_chain(&self, folder_id: Option<Uuid>) -> AppResult<Vec<Uuid>> {
        match folder_id {
            Some(id) => Ok(self
                .stores
                .folders
                .find_ancestors(id)
                .await?
                .into_iter()
                .map(|f| f.id)
                .collect()),
            None => Ok(Vec::new()),
        }
    }

    /// Resolver input for a file.
    pub async fn file_access(&self, file: &File) -> AppResult<ResourceAccess> {
        Ok(ResourceAccess::new(ResourceRef::File(file.id), file.owner_id)
            .public(file.is_public)
            .inheriting(self.folder_chain(file.folder_id).await?))
    }

    /// Resolver input for a folder.
    pub async fn folder_access(&self, folder: &Folder) -> AppResult<ResourceAccess> {
        Ok(ResourceAccess::new(ResourceRef::Folder(folder.id), folder.owner_id)
            .inheriting(self.folder_chain(folder.parent_id).await?))
    }

    async fn resolve(&self, ctx: &RequestContext, access: &ResourceAccess) -> AppResult<AccessLevel> {
        let grants = match ctx.user_id() {
            Some(user_id) if user_id != access.owner_id => {
                self.stores
                    .collaborators
                    .list_for_user_on(user_id, &access.grant_scopes())
                    .await?
            }
            _ => Vec::new(),
        };
        Ok(acl::resolve(&ctx.principal, access, &grants, Utc::now()))
    }

    fn check(
        level: AccessLevel,
        required: CollaboratorRole,
        access: &ResourceAccess,
    ) -> AppResult<AccessLevel> {
        if level.satisfies(required) {
            return Ok(level);
        }
        debug!(
            resource = ?access.resource,
            ?level,
            required = %required,
            "Permission denied"
        );
        Err(AppError::forbidden(format!(
            "{} access to this {} is required",
            required,
            access.resource.resource_type()
        )))
    }

    /// Effective access of the caller on a file.
    pub async fn resolve_file(&self, ctx: &RequestContext, file: &File) -> AppResult<AccessLevel> {
        let access = self.file_access(file).await?;
        self.resolve(ctx, &access).await
    }

    /// Require at least `required` on a file.
    pub async fn require_file(
        &self,
        ctx: &RequestContext,
        file: &File,
        required: CollaboratorRole,
    ) -> AppResult<AccessLevel> {
        let access = self.file_access(file).await?;
        let level = self.resolve(ctx, &access).await?;
        Self::check(level, required, &access)
    }

    /// Require at least `required` on a folder.
    pub async fn require_folder(
        &self,
        ctx: &RequestContext,
        folder: &Folder,
        required: CollaboratorRole,
    ) -> AppResult<AccessLevel> {
        let access = self.folder_access(folder).await?;
        let level = self.resolve(ctx, &access).await?;
        Self::check(level, required, &access)
    }

    /// Load a non-trashed file and require `required` on it.
    pub async fn load_file(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        required: CollaboratorRole,
    ) -> AppResult<(File, AccessLevel)> {
        let file = self
            .stores
            .files
            .find_by_id(file_id)
            .await?
            .filter(|f| !f.is_trashed)
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))?;
        let level = self.require_file(ctx, &file, required).await?;
        Ok((file, level))
    }

    /// Load a non-trashed folder and require `required` on it.
    pub async fn load_folder(
        &self,
        ctx: &RequestContext,
        folder_id: Uuid,
        required: CollaboratorRole,
    ) -> AppResult<(Folder, AccessLevel)> {
        let folder = self
            .stores
            .folders
            .find_by_id(folder_id)
            .await?
            .filter(|f| !f.is_trashed)
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))?;
        let level = self.require_folder(ctx, &folder, required).await?;
        Ok((folder, level))
    }
}
