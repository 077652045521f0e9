//! Collaborator grant repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use filehub_core::error::{AppError, ErrorKind};
use filehub_core::result::AppResult;
use filehub_entity::permission::{
    Collaborator, CollaboratorRole, ResourceRef, UpsertCollaborator,
};

use crate::store::CollaboratorStore;

/// Repository for collaborator grants.
#[derive(Debug, Clone)]
pub struct CollaboratorRepository {
    pool: PgPool,
}

impl CollaboratorRepository {
    /// Create a new collaborator repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Split resources into file and folder ID arrays for `= ANY($n)` binds.
fn split_resources(resources: &[ResourceRef]) -> (Vec<Uuid>, Vec<Uuid>) {
    let files = resources.iter().filter_map(ResourceRef::file_id).collect();
    let folders = resources.iter().filter_map(ResourceRef::folder_id).collect();
    (files, folders)
}

#[async_trait]
impl CollaboratorStore for CollaboratorRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Collaborator>> {
        sqlx::query_as::<_, Collaborator>("SELECT * FROM collaborators WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find collaborator", e)
            })
    }

    async fn list_for_resource(&self, resource: ResourceRef) -> AppResult<Vec<Collaborator>> {
        sqlx::query_as::<_, Collaborator>(
            "SELECT * FROM collaborators \
             WHERE file_id IS NOT DISTINCT FROM $1 AND folder_id IS NOT DISTINCT FROM $2 \
             ORDER BY created_at ASC",
        )
        .bind(resource.file_id())
        .bind(resource.folder_id())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list collaborators", e))
    }

    async fn list_for_user_on(
        &self,
        user_id: Uuid,
        resources: &[ResourceRef],
    ) -> AppResult<Vec<Collaborator>> {
        let (files, folders) = split_resources(resources);
        sqlx::query_as::<_, Collaborator>(
            "SELECT * FROM collaborators \
             WHERE user_id = $1 AND (file_id = ANY($2) OR folder_id = ANY($3))",
        )
        .bind(user_id)
        .bind(&files)
        .bind(&folders)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load user grants", e))
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Collaborator>> {
        sqlx::query_as::<_, Collaborator>(
            "SELECT * FROM collaborators WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list user grants", e))
    }

    async fn upsert(&self, data: &UpsertCollaborator) -> AppResult<Collaborator> {
        let sql = match data.resource {
            ResourceRef::File(_) => {
                "INSERT INTO collaborators (user_id, file_id, folder_id, role, expires_at, granted_by) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (file_id, user_id) WHERE file_id IS NOT NULL DO UPDATE SET \
                 role = EXCLUDED.role, expires_at = EXCLUDED.expires_at, \
                 granted_by = EXCLUDED.granted_by, updated_at = NOW() RETURNING *"
            }
            ResourceRef::Folder(_) => {
                "INSERT INTO collaborators (user_id, file_id, folder_id, role, expires_at, granted_by) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (folder_id, user_id) WHERE folder_id IS NOT NULL DO UPDATE SET \
                 role = EXCLUDED.role, expires_at = EXCLUDED.expires_at, \
                 granted_by = EXCLUDED.granted_by, updated_at = NOW() RETURNING *"
            }
        };

        sqlx::query_as::<_, Collaborator>(sql)
            .bind(data.user_id)
            .bind(data.resource.file_id())
            .bind(data.resource.folder_id())
            .bind(data.role)
            .bind(data.expires_at)
            .bind(data.granted_by)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to upsert collaborator", e)
            })
    }

    async fn update(
        &self,
        id: Uuid,
        role: CollaboratorRole,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<Collaborator> {
        sqlx::query_as::<_, Collaborator>(
            "UPDATE collaborators SET role = $2, expires_at = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(role)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update collaborator", e))?
        .ok_or_else(|| AppError::not_found(format!("Collaborator {id} not found")))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM collaborators WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete collaborator", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM collaborators WHERE expires_at IS NOT NULL AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to sweep collaborators", e)
        })?;
        Ok(result.rows_affected())
    }
}
