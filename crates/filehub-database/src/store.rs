//! Persistence traits consumed by the service layer.
//!
//! Each trait is implemented twice: by the PostgreSQL repositories in
//! [`crate::repositories`] and by [`crate::memory::MemoryDatabase`]. Every
//! method is a single atomic unit: compound operations (subtree trash,
//! guarded counter increments, path rewrites) commit entirely or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use filehub_core::result::AppResult;
use filehub_core::types::pagination::{PageRequest, PageResponse};
use filehub_entity::file::{CreateFile, File, UpdateFile};
use filehub_entity::folder::{CreateFolder, Folder};
use filehub_entity::permission::{Collaborator, CollaboratorRole, ResourceRef, UpsertCollaborator};
use filehub_entity::share::{CreateShareLink, ShareLink, UpdateShareLink};

/// Number of records a subtree operation changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SubtreeChange {
    /// Folder records changed.
    pub folders: u64,
    /// File records changed.
    pub files: u64,
}

impl SubtreeChange {
    /// Total records changed.
    pub fn total(&self) -> u64 {
        self.folders + self.files
    }
}

/// Records removed by a purge. The listed storage keys still have to be
/// deleted from the object store.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PurgedRecords {
    /// Folder records deleted.
    pub folders: u64,
    /// File records deleted.
    pub files: u64,
    /// Object keys of the deleted files.
    pub storage_keys: Vec<String>,
}

impl PurgedRecords {
    /// Fold another purge result into this one.
    pub fn absorb(&mut self, other: PurgedRecords) {
        self.folders += other.folders;
        self.files += other.files;
        self.storage_keys.extend(other.storage_keys);
    }
}

/// Trashed items of one owner, newest first.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrashListing {
    /// Trashed files.
    pub files: PageResponse<File>,
    /// Trashed folders.
    pub folders: PageResponse<Folder>,
}

/// File metadata persistence.
#[async_trait]
pub trait FileStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a file by ID, trashed or not.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<File>>;

    /// List non-trashed files directly inside `folder_id` (None = root).
    async fn list_in_folder(
        &self,
        owner_id: Uuid,
        folder_id: Option<Uuid>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<File>>;

    /// Insert a new file record.
    async fn create(&self, data: &CreateFile) -> AppResult<File>;

    /// Apply a metadata update.
    async fn update(&self, id: Uuid, data: &UpdateFile) -> AppResult<File>;

    /// Move a file to another folder (None = root).
    async fn move_to(&self, id: Uuid, folder_id: Option<Uuid>) -> AppResult<File>;
}

/// Folder persistence.
#[async_trait]
pub trait FolderStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a folder by ID, trashed or not.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>>;

    /// List non-trashed direct children of `parent_id` (None = root).
    async fn list_children(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Folder>>;

    /// Find a non-trashed folder named `name` under `parent_id`.
    async fn find_active_sibling(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<Folder>>;

    /// The chain from the root down to `id`, inclusive.
    async fn find_ancestors(&self, id: Uuid) -> AppResult<Vec<Folder>>;

    /// Insert a folder. A non-trashed sibling with the same name is a conflict.
    async fn create(&self, data: &CreateFolder) -> AppResult<Folder>;

    /// Change parent and/or name and rewrite the materialized path of the
    /// folder and every descendant.
    ///
    /// The new path is derived from the parent as stored when the move is
    /// applied. A parent that is the folder itself or lies beneath it is a
    /// conflict, checked atomically with the write.
    async fn relocate(&self, id: Uuid, parent_id: Option<Uuid>, name: &str) -> AppResult<Folder>;

    /// Set or clear the color tag.
    async fn set_color(&self, id: Uuid, color: Option<&str>) -> AppResult<Folder>;
}

/// Share link persistence.
#[async_trait]
pub trait ShareLinkStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a link by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ShareLink>>;

    /// Find a link by its token.
    async fn find_by_token(&self, token: &str) -> AppResult<Option<ShareLink>>;

    /// List links created by a user, newest first.
    async fn list_by_creator(
        &self,
        user_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ShareLink>>;

    /// Insert a link. A duplicate token yields a `Conflict` error.
    async fn create(&self, data: &CreateShareLink) -> AppResult<ShareLink>;

    /// Apply an update.
    async fn update(&self, id: Uuid, data: &UpdateShareLink) -> AppResult<ShareLink>;

    /// Delete a link. Returns `true` if it existed.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Count one download against the link and the file together.
    ///
    /// The increment only happens while the link is active, unexpired at
    /// `now` and under quota; `Ok(None)` means the guard rejected it and
    /// nothing changed. A missing or trashed file is `NotFound` and also
    /// leaves both counters untouched.
    async fn record_download(
        &self,
        share_id: Uuid,
        file_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ShareLink>>;

    /// Count one view under the same guard as [`record_download`](Self::record_download).
    async fn record_view(&self, share_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<ShareLink>>;
}

/// Collaborator grant persistence.
#[async_trait]
pub trait CollaboratorStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a grant by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Collaborator>>;

    /// All grants bound to a resource.
    async fn list_for_resource(&self, resource: ResourceRef) -> AppResult<Vec<Collaborator>>;

    /// Grants held by `user_id` on any of `resources`.
    async fn list_for_user_on(
        &self,
        user_id: Uuid,
        resources: &[ResourceRef],
    ) -> AppResult<Vec<Collaborator>>;

    /// All grants held by a user.
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Collaborator>>;

    /// Insert or replace the grant of a (resource, user) pair.
    async fn upsert(&self, data: &UpsertCollaborator) -> AppResult<Collaborator>;

    /// Change role and expiry.
    async fn update(
        &self,
        id: Uuid,
        role: CollaboratorRole,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<Collaborator>;

    /// Delete a grant. Returns `true` if it existed.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Delete every grant expired at `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// Trash lifecycle persistence. Every method is one transaction.
#[async_trait]
pub trait TrashStore: Send + Sync + std::fmt::Debug + 'static {
    /// Trash one file. Already trashed files are left alone (0 changed).
    async fn trash_file(&self, owner_id: Uuid, file_id: Uuid, at: DateTime<Utc>) -> AppResult<u64>;

    /// Trash a folder, its files and every non-trashed descendant with one
    /// timestamp.
    async fn trash_folder(
        &self,
        owner_id: Uuid,
        folder_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<SubtreeChange>;

    /// Restore a trashed file. The parent folder must not be trashed.
    async fn restore_file(&self, owner_id: Uuid, file_id: Uuid) -> AppResult<u64>;

    /// Restore a trashed folder and everything trashed together with it.
    async fn restore_folder(&self, owner_id: Uuid, folder_id: Uuid) -> AppResult<SubtreeChange>;

    /// List trashed items.
    async fn list_trashed(&self, owner_id: Uuid, page: &PageRequest) -> AppResult<TrashListing>;

    /// Delete a trashed file record.
    async fn purge_file(&self, owner_id: Uuid, file_id: Uuid) -> AppResult<PurgedRecords>;

    /// Delete a trashed folder with its whole subtree, bottom-up.
    async fn purge_folder(&self, owner_id: Uuid, folder_id: Uuid) -> AppResult<PurgedRecords>;

    /// Delete every trashed item of an owner.
    async fn purge_all(&self, owner_id: Uuid) -> AppResult<PurgedRecords>;

    /// Delete every item, of any owner, trashed before `cutoff`.
    async fn purge_trashed_before(&self, cutoff: DateTime<Utc>) -> AppResult<PurgedRecords>;
}
