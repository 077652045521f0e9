//! Trash lifecycle of the in-memory database.

use std::cmp::Reverse;
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use filehub_core::error::AppError;
use filehub_core::result::AppResult;
use filehub_core::types::pagination::{PageRequest, PageResponse};
use filehub_entity::file::File;
use filehub_entity::folder::Folder;

use super::{MemoryDatabase, Tables};
use crate::store::{PurgedRecords, SubtreeChange, TrashListing, TrashStore};

impl Tables {
    fn owned_file(&self, owner_id: Uuid, file_id: Uuid) -> AppResult<&File> {
        self.files
            .get(&file_id)
            .filter(|f| f.owner_id == owner_id)
            .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
    }

    fn owned_folder(&self, owner_id: Uuid, folder_id: Uuid) -> AppResult<&Folder> {
        self.folders
            .get(&folder_id)
            .filter(|f| f.owner_id == owner_id)
            .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))
    }

    fn ensure_parent_live(&self, parent_id: Option<Uuid>) -> AppResult<()> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };
        match self.folders.get(&parent_id) {
            Some(parent) if !parent.is_trashed => Ok(()),
            Some(_) => Err(AppError::conflict(
                "Parent folder is in the trash; restore it first",
            )),
            None => Err(AppError::inconsistent(format!(
                "Parent folder {parent_id} does not exist"
            ))),
        }
    }

    /// Remove the subtrees under `roots` plus `extra_files`, files first.
    /// Share links and grants on removed records go with them.
    fn purge(&mut self, roots: &[Uuid], extra_files: &[Uuid]) -> PurgedRecords {
        let mut folder_ids = HashSet::new();
        for root in roots {
            if folder_ids.contains(root) {
                continue;
            }
            folder_ids.extend(self.subtree(*root, |_| true));
        }

        let file_ids: Vec<Uuid> = self
            .files
            .values()
            .filter(|f| {
                extra_files.contains(&f.id) || f.folder_id.is_some_and(|id| folder_ids.contains(&id))
            })
            .map(|f| f.id)
            .collect();
        let mut storage_keys = Vec::with_capacity(file_ids.len());
        for id in &file_ids {
            if let Some(file) = self.files.remove(id) {
                storage_keys.push(file.storage_key);
            }
        }
        let mut folders = 0;
        for id in &folder_ids {
            if self.folders.remove(id).is_some() {
                folders += 1;
            }
        }

        let gone = |file_id: Option<Uuid>, folder_id: Option<Uuid>| {
            file_id.is_some_and(|id| file_ids.contains(&id))
                || folder_id.is_some_and(|id| folder_ids.contains(&id))
        };
        self.share_links.retain(|_, l| !gone(l.file_id, l.folder_id));
        self.collaborators.retain(|_, c| !gone(c.file_id, c.folder_id));

        PurgedRecords {
            folders,
            files: storage_keys.len() as u64,
            storage_keys,
        }
    }
}

#[async_trait]
impl TrashStore for MemoryDatabase {
    async fn trash_file(&self, owner_id: Uuid, file_id: Uuid, at: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        if state.owned_file(owner_id, file_id)?.is_trashed {
            return Ok(0);
        }
        if let Some(file) = state.files.get_mut(&file_id) {
            file.is_trashed = true;
            file.trashed_at = Some(at);
            file.updated_at = Utc::now();
        }
        Ok(1)
    }

    async fn trash_folder(
        &self,
        owner_id: Uuid,
        folder_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<SubtreeChange> {
        let mut state = self.state.lock().await;
        if state.owned_folder(owner_id, folder_id)?.is_trashed {
            return Ok(SubtreeChange::default());
        }

        let ids: HashSet<Uuid> = state.subtree(folder_id, |f| !f.is_trashed).into_iter().collect();
        let now = Utc::now();
        let mut change = SubtreeChange::default();
        for folder in state.folders.values_mut() {
            if ids.contains(&folder.id) && !folder.is_trashed {
                folder.is_trashed = true;
                folder.trashed_at = Some(at);
                folder.updated_at = now;
                change.folders += 1;
            }
        }
        for file in state.files.values_mut() {
            if file.folder_id.is_some_and(|id| ids.contains(&id)) && !file.is_trashed {
                file.is_trashed = true;
                file.trashed_at = Some(at);
                file.updated_at = now;
                change.files += 1;
            }
        }
        Ok(change)
    }

    async fn restore_file(&self, owner_id: Uuid, file_id: Uuid) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let file = state.owned_file(owner_id, file_id)?;
        if !file.is_trashed {
            return Err(AppError::not_found(format!("File {file_id} is not in the trash")));
        }
        state.ensure_parent_live(file.folder_id)?;
        if let Some(file) = state.files.get_mut(&file_id) {
            file.is_trashed = false;
            file.trashed_at = None;
            file.updated_at = Utc::now();
        }
        Ok(1)
    }

    async fn restore_folder(&self, owner_id: Uuid, folder_id: Uuid) -> AppResult<SubtreeChange> {
        let mut state = self.state.lock().await;
        let root = state.owned_folder(owner_id, folder_id)?.clone();
        let Some(at) = root.trashed_at.filter(|_| root.is_trashed) else {
            return Err(AppError::not_found(format!(
                "Folder {folder_id} is not in the trash"
            )));
        };
        state.ensure_parent_live(root.parent_id)?;
        if state
            .active_sibling(owner_id, root.parent_id, &root.name, Some(root.id))
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "A folder named '{}' already exists at the restore location",
                root.name
            )));
        }

        let ids: HashSet<Uuid> = state
            .subtree(folder_id, |f| f.is_trashed && f.trashed_at == Some(at))
            .into_iter()
            .collect();
        let now = Utc::now();
        let mut change = SubtreeChange::default();
        for folder in state.folders.values_mut() {
            if ids.contains(&folder.id) {
                folder.is_trashed = false;
                folder.trashed_at = None;
                folder.updated_at = now;
                change.folders += 1;
            }
        }
        for file in state.files.values_mut() {
            if file.folder_id.is_some_and(|id| ids.contains(&id))
                && file.is_trashed
                && file.trashed_at == Some(at)
            {
                file.is_trashed = false;
                file.trashed_at = None;
                file.updated_at = now;
                change.files += 1;
            }
        }
        Ok(change)
    }

    async fn list_trashed(&self, owner_id: Uuid, page: &PageRequest) -> AppResult<TrashListing> {
        let state = self.state.lock().await;
        let mut files: Vec<File> = state
            .files
            .values()
            .filter(|f| f.owner_id == owner_id && f.is_trashed)
            .cloned()
            .collect();
        files.sort_by(|a, b| {
            Reverse(a.trashed_at)
                .cmp(&Reverse(b.trashed_at))
                .then_with(|| a.name.cmp(&b.name))
        });
        let mut folders: Vec<Folder> = state
            .folders
            .values()
            .filter(|f| f.owner_id == owner_id && f.is_trashed)
            .cloned()
            .collect();
        folders.sort_by(|a, b| {
            Reverse(a.trashed_at)
                .cmp(&Reverse(b.trashed_at))
                .then_with(|| a.path.cmp(&b.path))
        });
        Ok(TrashListing {
            files: PageResponse::from_vec(files, page),
            folders: PageResponse::from_vec(folders, page),
        })
    }

    async fn purge_file(&self, owner_id: Uuid, file_id: Uuid) -> AppResult<PurgedRecords> {
        let mut state = self.state.lock().await;
        if !state.owned_file(owner_id, file_id)?.is_trashed {
            return Err(AppError::not_found(format!("File {file_id} is not in the trash")));
        }
        Ok(state.purge(&[], &[file_id]))
    }

    async fn purge_folder(&self, owner_id: Uuid, folder_id: Uuid) -> AppResult<PurgedRecords> {
        let mut state = self.state.lock().await;
        if !state.owned_folder(owner_id, folder_id)?.is_trashed {
            return Err(AppError::not_found(format!(
                "Folder {folder_id} is not in the trash"
            )));
        }
        Ok(state.purge(&[folder_id], &[]))
    }

    async fn purge_all(&self, owner_id: Uuid) -> AppResult<PurgedRecords> {
        let mut state = self.state.lock().await;
        let roots: Vec<Uuid> = state
            .folders
            .values()
            .filter(|f| f.owner_id == owner_id && f.is_trashed)
            .map(|f| f.id)
            .collect();
        let files: Vec<Uuid> = state
            .files
            .values()
            .filter(|f| f.owner_id == owner_id && f.is_trashed)
            .map(|f| f.id)
            .collect();
        Ok(state.purge(&roots, &files))
    }

    async fn purge_trashed_before(&self, cutoff: DateTime<Utc>) -> AppResult<PurgedRecords> {
        let mut state = self.state.lock().await;
        let expired = |trashed: bool, at: Option<DateTime<Utc>>| trashed && at.is_some_and(|at| at < cutoff);
        let roots: Vec<Uuid> = state
            .folders
            .values()
            .filter(|f| expired(f.is_trashed, f.trashed_at))
            .map(|f| f.id)
            .collect();
        let files: Vec<Uuid> = state
            .files
            .values()
            .filter(|f| expired(f.is_trashed, f.trashed_at))
            .map(|f| f.id)
            .collect();
        Ok(state.purge(&roots, &files))
    }
}
