//! In-memory implementation of every persistence trait.
//!
//! All tables live behind one Tokio mutex, so each trait method is atomic
//! with respect to every other. Suitable for tests and single-node
//! development; state is lost on restart.

mod share;
mod trash;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use filehub_core::error::AppError;
use filehub_core::result::AppResult;
use filehub_core::types::pagination::{PageRequest, PageResponse};
use filehub_entity::file::{CreateFile, File, UpdateFile};
use filehub_entity::folder::path;
use filehub_entity::folder::{CreateFolder, Folder};
use filehub_entity::permission::Collaborator;
use filehub_entity::share::ShareLink;

use crate::store::{FileStore, FolderStore};

/// Protected table state.
#[derive(Debug, Default)]
struct Tables {
    files: HashMap<Uuid, File>,
    folders: HashMap<Uuid, Folder>,
    share_links: HashMap<Uuid, ShareLink>,
    collaborators: HashMap<Uuid, Collaborator>,
}

impl Tables {
    fn active_sibling(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
        except: Option<Uuid>,
    ) -> Option<&Folder> {
        self.folders.values().find(|f| {
            f.owner_id == owner_id
                && f.parent_id == parent_id
                && f.name == name
                && !f.is_trashed
                && Some(f.id) != except
        })
    }

    fn child_folder_ids(&self, parent_id: Uuid) -> Vec<Uuid> {
        self.folders
            .values()
            .filter(|f| f.parent_id == Some(parent_id))
            .map(|f| f.id)
            .collect()
    }

    /// The live folder `parent_id`, provided it is not `moving` or one of
    /// its descendants. Walks the parent chain up from `parent_id`.
    fn writable_parent(&self, moving: Uuid, parent_id: Uuid) -> AppResult<&Folder> {
        let parent = self
            .folders
            .get(&parent_id)
            .ok_or_else(|| AppError::not_found(format!("Folder {parent_id} not found")))?;
        if parent.is_trashed {
            return Err(AppError::conflict("Destination folder is in the trash"));
        }
        let mut cursor = Some(parent_id);
        let mut steps = 0;
        while let Some(current) = cursor {
            if current == moving {
                return Err(AppError::conflict(
                    "Cannot move a folder into itself or one of its descendants",
                ));
            }
            steps += 1;
            if steps > self.folders.len() {
                return Err(AppError::inconsistent(format!(
                    "Folder {parent_id} has a cyclic parent chain"
                )));
            }
            cursor = self.folders.get(&current).and_then(|f| f.parent_id);
        }
        Ok(parent)
    }

    /// Root first, every folder after its parent; `descend` filters children.
    fn subtree(&self, root: Uuid, descend: impl Fn(&Folder) -> bool) -> Vec<Uuid> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(
                self.child_folder_ids(id)
                    .into_iter()
                    .filter(|child| self.folders.get(child).is_some_and(&descend)),
            );
        }
        order
    }
}

/// In-memory database implementing all store traits.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    /// Protected tables.
    state: Arc<Mutex<Tables>>,
}

impl MemoryDatabase {
    /// Creates an empty in-memory database.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileStore for MemoryDatabase {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<File>> {
        Ok(self.state.lock().await.files.get(&id).cloned())
    }

    async fn list_in_folder(
        &self,
        owner_id: Uuid,
        folder_id: Option<Uuid>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<File>> {
        let state = self.state.lock().await;
        let mut files: Vec<File> = state
            .files
            .values()
            .filter(|f| f.owner_id == owner_id && f.folder_id == folder_id && !f.is_trashed)
            .cloned()
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(PageResponse::from_vec(files, page))
    }

    async fn create(&self, data: &CreateFile) -> AppResult<File> {
        let mut state = self.state.lock().await;
        if state.files.contains_key(&data.id)
            || state.files.values().any(|f| f.storage_key == data.storage_key)
        {
            return Err(AppError::conflict(format!(
                "Storage key '{}' already in use",
                data.storage_key
            )));
        }
        let now = Utc::now();
        let file = File {
            id: data.id,
            owner_id: data.owner_id,
            folder_id: data.folder_id,
            name: data.name.clone(),
            storage_key: data.storage_key.clone(),
            size_bytes: data.size_bytes,
            content_type: data.content_type.clone(),
            extension: data.extension.clone(),
            description: data.description.clone(),
            is_public: data.is_public,
            is_starred: false,
            is_trashed: false,
            trashed_at: None,
            download_count: 0,
            created_at: now,
            updated_at: now,
        };
        state.files.insert(file.id, file.clone());
        Ok(file)
    }

    async fn update(&self, id: Uuid, data: &UpdateFile) -> AppResult<File> {
        let mut state = self.state.lock().await;
        let file = state
            .files
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        if let Some(name) = &data.name {
            file.name = name.clone();
        }
        if let Some(description) = &data.description {
            file.description = description.clone();
        }
        if let Some(is_public) = data.is_public {
            file.is_public = is_public;
        }
        if let Some(is_starred) = data.is_starred {
            file.is_starred = is_starred;
        }
        file.updated_at = Utc::now();
        Ok(file.clone())
    }

    async fn move_to(&self, id: Uuid, folder_id: Option<Uuid>) -> AppResult<File> {
        let mut state = self.state.lock().await;
        let file = state
            .files
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        file.folder_id = folder_id;
        file.updated_at = Utc::now();
        Ok(file.clone())
    }
}

#[async_trait]
impl FolderStore for MemoryDatabase {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>> {
        Ok(self.state.lock().await.folders.get(&id).cloned())
    }

    async fn list_children(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Folder>> {
        let state = self.state.lock().await;
        let mut folders: Vec<Folder> = state
            .folders
            .values()
            .filter(|f| f.owner_id == owner_id && f.parent_id == parent_id && !f.is_trashed)
            .cloned()
            .collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(PageResponse::from_vec(folders, page))
    }

    async fn find_active_sibling(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<Folder>> {
        let state = self.state.lock().await;
        Ok(state.active_sibling(owner_id, parent_id, name, None).cloned())
    }

    async fn find_ancestors(&self, id: Uuid) -> AppResult<Vec<Folder>> {
        let state = self.state.lock().await;
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(folder) = state.folders.get(&current) else {
                break;
            };
            if chain.len() > state.folders.len() {
                return Err(AppError::inconsistent(format!(
                    "Folder {id} has a cyclic parent chain"
                )));
            }
            chain.push(folder.clone());
            cursor = folder.parent_id;
        }
        chain.reverse();
        Ok(chain)
    }

    async fn create(&self, data: &CreateFolder) -> AppResult<Folder> {
        let mut state = self.state.lock().await;
        if state
            .active_sibling(data.owner_id, data.parent_id, &data.name, None)
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "Folder '{}' already exists here",
                data.name
            )));
        }
        let now = Utc::now();
        let folder = Folder {
            id: Uuid::new_v4(),
            owner_id: data.owner_id,
            parent_id: data.parent_id,
            name: data.name.clone(),
            path: data.path.clone(),
            color: data.color.clone(),
            is_trashed: false,
            trashed_at: None,
            created_at: now,
            updated_at: now,
        };
        state.folders.insert(folder.id, folder.clone());
        Ok(folder)
    }

    async fn relocate(&self, id: Uuid, parent_id: Option<Uuid>, name: &str) -> AppResult<Folder> {
        let mut state = self.state.lock().await;
        let folder = state
            .folders
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        let parent_path = match parent_id {
            Some(parent_id) => Some(state.writable_parent(id, parent_id)?.path.clone()),
            None => None,
        };
        if state
            .active_sibling(folder.owner_id, parent_id, name, Some(id))
            .is_some()
        {
            return Err(AppError::conflict(format!("Folder '{name}' already exists here")));
        }
        let new_path = path::child_path(parent_path.as_deref(), name);

        let now = Utc::now();
        let descendants = state.subtree(id, |_| true);
        for descendant in descendants.into_iter().skip(1) {
            if let Some(child) = state.folders.get_mut(&descendant) {
                if let Some(rebased) = path::rebase(&child.path, &folder.path, &new_path) {
                    child.path = rebased;
                    child.updated_at = now;
                }
            }
        }

        let entry = state
            .folders
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        entry.parent_id = parent_id;
        entry.name = name.to_string();
        entry.path = new_path;
        entry.updated_at = now;
        Ok(entry.clone())
    }

    async fn set_color(&self, id: Uuid, color: Option<&str>) -> AppResult<Folder> {
        let mut state = self.state.lock().await;
        let folder = state
            .folders
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        folder.color = color.map(str::to_string);
        folder.updated_at = Utc::now();
        Ok(folder.clone())
    }
}
