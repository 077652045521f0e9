//! Share link and collaborator tables of the in-memory database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use filehub_core::error::AppError;
use filehub_core::result::AppResult;
use filehub_core::types::pagination::{PageRequest, PageResponse};
use filehub_entity::permission::{Collaborator, CollaboratorRole, ResourceRef, UpsertCollaborator};
use filehub_entity::share::{CreateShareLink, ShareLink, UpdateShareLink};

use super::MemoryDatabase;
use crate::store::{CollaboratorStore, ShareLinkStore};

fn same_resource(c: &Collaborator, resource: ResourceRef) -> bool {
    c.file_id == resource.file_id() && c.folder_id == resource.folder_id()
}

#[async_trait]
impl ShareLinkStore for MemoryDatabase {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ShareLink>> {
        Ok(self.state.lock().await.share_links.get(&id).cloned())
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<ShareLink>> {
        let state = self.state.lock().await;
        Ok(state.share_links.values().find(|l| l.token == token).cloned())
    }

    async fn list_by_creator(
        &self,
        user_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ShareLink>> {
        let state = self.state.lock().await;
        let mut links: Vec<ShareLink> = state
            .share_links
            .values()
            .filter(|l| l.created_by == user_id)
            .cloned()
            .collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(PageResponse::from_vec(links, page))
    }

    async fn create(&self, data: &CreateShareLink) -> AppResult<ShareLink> {
        let mut state = self.state.lock().await;
        if state.share_links.values().any(|l| l.token == data.token) {
            return Err(AppError::conflict("Share token already in use"));
        }
        let now = Utc::now();
        let link = ShareLink {
            id: Uuid::new_v4(),
            created_by: data.created_by,
            file_id: data.resource.file_id(),
            folder_id: data.resource.folder_id(),
            token: data.token.clone(),
            password_hash: data.password_hash.clone(),
            permission: data.permission,
            allow_download: data.allow_download,
            description: data.description.clone(),
            expires_at: data.expires_at,
            max_downloads: data.max_downloads,
            download_count: 0,
            view_count: 0,
            is_active: true,
            last_accessed_at: None,
            created_at: now,
            updated_at: now,
        };
        state.share_links.insert(link.id, link.clone());
        Ok(link)
    }

    async fn update(&self, id: Uuid, data: &UpdateShareLink) -> AppResult<ShareLink> {
        let mut state = self.state.lock().await;
        let link = state
            .share_links
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Share link {id} not found")))?;
        if let Some(hash) = &data.password_hash {
            link.password_hash = hash.clone();
        }
        if let Some(permission) = data.permission {
            link.permission = permission;
        }
        if let Some(allow) = data.allow_download {
            link.allow_download = allow;
        }
        if let Some(description) = &data.description {
            link.description = description.clone();
        }
        if let Some(expires_at) = data.expires_at {
            link.expires_at = expires_at;
        }
        if let Some(max) = data.max_downloads {
            link.max_downloads = max;
        }
        if let Some(active) = data.is_active {
            link.is_active = active;
        }
        link.updated_at = Utc::now();
        Ok(link.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.state.lock().await.share_links.remove(&id).is_some())
    }

    async fn record_download(
        &self,
        share_id: Uuid,
        file_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ShareLink>> {
        let mut state = self.state.lock().await;
        let accessible = state
            .share_links
            .get(&share_id)
            .is_some_and(|l| l.is_accessible(now));
        if !accessible {
            return Ok(None);
        }
        match state.files.get_mut(&file_id) {
            Some(file) if !file.is_trashed => file.download_count += 1,
            _ => return Err(AppError::not_found("Shared file not found")),
        }
        let link = state
            .share_links
            .get_mut(&share_id)
            .ok_or_else(|| AppError::not_found(format!("Share link {share_id} not found")))?;
        link.download_count += 1;
        link.last_accessed_at = Some(now);
        link.updated_at = now;
        Ok(Some(link.clone()))
    }

    async fn record_view(&self, share_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<ShareLink>> {
        let mut state = self.state.lock().await;
        let Some(link) = state.share_links.get_mut(&share_id) else {
            return Ok(None);
        };
        if !link.is_accessible(now) {
            return Ok(None);
        }
        link.view_count += 1;
        link.last_accessed_at = Some(now);
        link.updated_at = now;
        Ok(Some(link.clone()))
    }
}

#[async_trait]
impl CollaboratorStore for MemoryDatabase {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Collaborator>> {
        Ok(self.state.lock().await.collaborators.get(&id).cloned())
    }

    async fn list_for_resource(&self, resource: ResourceRef) -> AppResult<Vec<Collaborator>> {
        let state = self.state.lock().await;
        let mut grants: Vec<Collaborator> = state
            .collaborators
            .values()
            .filter(|c| same_resource(c, resource))
            .cloned()
            .collect();
        grants.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(grants)
    }

    async fn list_for_user_on(
        &self,
        user_id: Uuid,
        resources: &[ResourceRef],
    ) -> AppResult<Vec<Collaborator>> {
        let state = self.state.lock().await;
        Ok(state
            .collaborators
            .values()
            .filter(|c| c.user_id == user_id && resources.iter().any(|r| same_resource(c, *r)))
            .cloned()
            .collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Collaborator>> {
        let state = self.state.lock().await;
        let mut grants: Vec<Collaborator> = state
            .collaborators
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        grants.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(grants)
    }

    async fn upsert(&self, data: &UpsertCollaborator) -> AppResult<Collaborator> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        if let Some(existing) = state
            .collaborators
            .values_mut()
            .find(|c| c.user_id == data.user_id && same_resource(c, data.resource))
        {
            existing.role = data.role;
            existing.expires_at = data.expires_at;
            existing.granted_by = data.granted_by;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let grant = Collaborator {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            file_id: data.resource.file_id(),
            folder_id: data.resource.folder_id(),
            role: data.role,
            expires_at: data.expires_at,
            granted_by: data.granted_by,
            created_at: now,
            updated_at: now,
        };
        state.collaborators.insert(grant.id, grant.clone());
        Ok(grant)
    }

    async fn update(
        &self,
        id: Uuid,
        role: CollaboratorRole,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<Collaborator> {
        let mut state = self.state.lock().await;
        let grant = state
            .collaborators
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Collaborator {id} not found")))?;
        grant.role = role;
        grant.expires_at = expires_at;
        grant.updated_at = Utc::now();
        Ok(grant.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.state.lock().await.collaborators.remove(&id).is_some())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let before = state.collaborators.len();
        state.collaborators.retain(|_, c| !c.is_expired(now));
        Ok((before - state.collaborators.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filehub_entity::file::CreateFile;
    use filehub_entity::share::SharePermission;

    use crate::store::FileStore;

    async fn shared_file(db: &MemoryDatabase, max_downloads: i32) -> (Uuid, ShareLink) {
        let owner = Uuid::new_v4();
        let id = Uuid::new_v4();
        FileStore::create(
            db,
            &CreateFile {
                id,
                owner_id: owner,
                folder_id: None,
                name: "report.pdf".into(),
                storage_key: format!("{owner}/{id}.pdf"),
                size_bytes: 10,
                content_type: "application/pdf".into(),
                extension: Some("pdf".into()),
                description: None,
                is_public: false,
            },
        )
        .await
        .unwrap();
        let link = ShareLinkStore::create(
            db,
            &CreateShareLink {
                created_by: owner,
                resource: ResourceRef::File(id),
                token: format!("tok-{id}"),
                password_hash: None,
                permission: SharePermission::View,
                allow_download: true,
                description: None,
                expires_at: None,
                max_downloads,
            },
        )
        .await
        .unwrap();
        (id, link)
    }

    #[tokio::test]
    async fn test_record_download_stops_at_quota() {
        let db = MemoryDatabase::new();
        let (file_id, link) = shared_file(&db, 2).await;
        let now = Utc::now();

        assert!(db.record_download(link.id, file_id, now).await.unwrap().is_some());
        assert!(db.record_download(link.id, file_id, now).await.unwrap().is_some());
        assert!(db.record_download(link.id, file_id, now).await.unwrap().is_none());

        let link = ShareLinkStore::find_by_id(&db, link.id).await.unwrap().unwrap();
        assert_eq!(link.download_count, 2);
        let file = FileStore::find_by_id(&db, file_id).await.unwrap().unwrap();
        assert_eq!(file.download_count, 2);
    }

    #[tokio::test]
    async fn test_missing_file_leaves_link_counter_untouched() {
        let db = MemoryDatabase::new();
        let (_, link) = shared_file(&db, 0).await;

        let err = db
            .record_download(link.id, Uuid::new_v4(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind, filehub_core::ErrorKind::NotFound);
        let link = ShareLinkStore::find_by_id(&db, link.id).await.unwrap().unwrap();
        assert_eq!(link.download_count, 0);
    }

    #[tokio::test]
    async fn test_duplicate_token_conflicts() {
        let db = MemoryDatabase::new();
        let (file_id, link) = shared_file(&db, 0).await;
        let err = ShareLinkStore::create(
            &db,
            &CreateShareLink {
                created_by: link.created_by,
                resource: ResourceRef::File(file_id),
                token: link.token.clone(),
                password_hash: None,
                permission: SharePermission::View,
                allow_download: false,
                description: None,
                expires_at: None,
                max_downloads: 0,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, filehub_core::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_grant() {
        let db = MemoryDatabase::new();
        let user = Uuid::new_v4();
        let resource = ResourceRef::Folder(Uuid::new_v4());
        let first = db
            .upsert(&UpsertCollaborator {
                resource,
                user_id: user,
                role: CollaboratorRole::Viewer,
                expires_at: None,
                granted_by: Uuid::new_v4(),
            })
            .await
            .unwrap();
        let second = db
            .upsert(&UpsertCollaborator {
                resource,
                user_id: user,
                role: CollaboratorRole::Editor,
                expires_at: None,
                granted_by: Uuid::new_v4(),
            })
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(db.list_for_resource(resource).await.unwrap().len(), 1);
        assert_eq!(second.role, CollaboratorRole::Editor);
    }
}
