//! All services, wired once over one set of stores and one storage manager.

use std::sync::Arc;

use filehub_auth::password::PasswordHasher;
use filehub_core::config::{SharingConfig, TrashConfig, UploadConfig};
use filehub_storage::StorageManager;

use crate::file::{DownloadService, FileService, UploadService};
use crate::folder::FolderService;
use crate::permission::{CollaboratorService, PermissionService};
use crate::share::{ShareAccessService, ShareService};
use crate::stores::Stores;
use crate::trash::TrashService;

/// Shared service registry handed to whatever fronts the core.
#[derive(Debug, Clone)]
pub struct Services {
    // ── Infrastructure ───────────────────────────────────────
    /// Persistence stores.
    pub stores: Stores,
    /// Object storage.
    pub storage: StorageManager,

    // ── Authorization ────────────────────────────────────────
    /// Permission checks.
    pub permissions: PermissionService,
    /// Collaborator grants.
    pub collaborators: CollaboratorService,

    // ── Sharing ──────────────────────────────────────────────
    /// Share link management.
    pub shares: ShareService,
    /// Anonymous share access.
    pub share_access: ShareAccessService,

    // ── Files ────────────────────────────────────────────────
    /// Folder tree.
    pub folders: FolderService,
    /// File metadata.
    pub files: FileService,
    /// Uploads.
    pub uploads: UploadService,
    /// Authenticated downloads.
    pub downloads: DownloadService,
    /// Trash lifecycle.
    pub trash: TrashService,
}

impl Services {
    /// Build every service over `stores` and `storage`.
    pub fn new(
        stores: Stores,
        storage: StorageManager,
        sharing: SharingConfig,
        upload: UploadConfig,
        trash: TrashConfig,
    ) -> Self {
        let hasher = Arc::new(PasswordHasher::new());
        let permissions = PermissionService::new(stores.clone());

        Self {
            collaborators: CollaboratorService::new(stores.clone(), permissions.clone()),
            shares: ShareService::new(
                stores.clone(),
                permissions.clone(),
                Arc::clone(&hasher),
                sharing,
            ),
            share_access: ShareAccessService::new(stores.clone(), storage.clone(), hasher),
            folders: FolderService::new(stores.clone(), permissions.clone()),
            files: FileService::new(stores.clone(), permissions.clone(), storage.clone()),
            uploads: UploadService::new(
                stores.clone(),
                permissions.clone(),
                storage.clone(),
                upload,
            ),
            downloads: DownloadService::new(permissions.clone(), storage.clone()),
            trash: TrashService::new(stores.clone(), storage.clone(), trash),
            permissions,
            stores,
            storage,
        }
    }
}
