//! Folder repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use filehub_core::error::{AppError, ErrorKind};
use filehub_core::result::AppResult;
use filehub_core::types::pagination::{PageRequest, PageResponse};
use filehub_entity::folder::{CreateFolder, Folder, path};

use crate::store::FolderStore;

const SIBLING_NAME_KEY: &str = "folders_active_sibling_name_key";

/// Advisory lock key for one owner's folder tree.
fn tree_lock_key(owner_id: Uuid) -> i64 {
    let bytes = owner_id.as_bytes();
    i64::from_be_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Repository for folder CRUD and tree queries.
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    /// Create a new folder repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FolderStore for FolderRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    async fn list_children(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Folder>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM folders \
             WHERE owner_id = $1 AND parent_id IS NOT DISTINCT FROM $2 AND NOT is_trashed",
        )
        .bind(owner_id)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count folders", e))?;

        let folders = sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE owner_id = $1 AND parent_id IS NOT DISTINCT FROM $2 AND NOT is_trashed \
             ORDER BY name ASC LIMIT $3 OFFSET $4",
        )
        .bind(owner_id)
        .bind(parent_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list folders", e))?;

        Ok(PageResponse::new(folders, page.page, page.page_size, total as u64))
    }

    async fn find_active_sibling(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE owner_id = $1 AND parent_id IS NOT DISTINCT FROM $2 AND name = $3 \
             AND NOT is_trashed",
        )
        .bind(owner_id)
        .bind(parent_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find sibling", e))
    }

    async fn find_ancestors(&self, id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "WITH RECURSIVE ancestors AS ( \
                SELECT f.*, 0 AS lvl FROM folders f WHERE f.id = $1 \
                UNION ALL \
                SELECT p.*, a.lvl + 1 FROM folders p INNER JOIN ancestors a ON p.id = a.parent_id \
             ) SELECT * FROM ancestors ORDER BY lvl DESC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find ancestors", e))
    }

    async fn create(&self, data: &CreateFolder) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>(
            "INSERT INTO folders (owner_id, parent_id, name, path, color) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(data.owner_id)
        .bind(data.parent_id)
        .bind(&data.name)
        .bind(&data.path)
        .bind(&data.color)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            super::map_unique(
                e,
                SIBLING_NAME_KEY,
                || format!("Folder '{}' already exists here", data.name),
                "Failed to create folder",
            )
        })
    }

    async fn relocate(&self, id: Uuid, parent_id: Option<Uuid>, name: &str) -> AppResult<Folder> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let owner_id: Uuid = sqlx::query_scalar("SELECT owner_id FROM folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))?
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;

        // Moves within one owner's tree are serialized, so the ancestor
        // check below sees every committed reparenting.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(tree_lock_key(owner_id))
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock folder tree", e))?;

        let old_path: String =
            sqlx::query_scalar("SELECT path FROM folders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock folder", e))?
                .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;

        let parent_path = match parent_id {
            Some(parent_id) => {
                let parent = sqlx::query_as::<_, Folder>(
                    "SELECT * FROM folders WHERE id = $1 FOR UPDATE",
                )
                .bind(parent_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to lock destination", e)
                })?
                .ok_or_else(|| AppError::not_found(format!("Folder {parent_id} not found")))?;
                if parent.is_trashed {
                    return Err(AppError::conflict("Destination folder is in the trash"));
                }

                let inside: bool = sqlx::query_scalar(
                    "WITH RECURSIVE chain(id, parent_id) AS ( \
                        SELECT id, parent_id FROM folders WHERE id = $1 \
                        UNION \
                        SELECT f.id, f.parent_id FROM folders f INNER JOIN chain c ON f.id = c.parent_id \
                     ) SELECT EXISTS (SELECT 1 FROM chain WHERE id = $2)",
                )
                .bind(parent_id)
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to walk destination ancestors", e)
                })?;
                if inside {
                    return Err(AppError::conflict(
                        "Cannot move a folder into itself or one of its descendants",
                    ));
                }
                Some(parent.path)
            }
            None => None,
        };
        let new_path = path::child_path(parent_path.as_deref(), name);

        let folder = sqlx::query_as::<_, Folder>(
            "UPDATE folders SET parent_id = $2, name = $3, path = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(parent_id)
        .bind(name)
        .bind(&new_path)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            super::map_unique(
                e,
                SIBLING_NAME_KEY,
                || format!("Folder '{name}' already exists here"),
                "Failed to relocate folder",
            )
        })?;

        sqlx::query(
            "WITH RECURSIVE tree AS ( \
                SELECT id FROM folders WHERE parent_id = $1 \
                UNION ALL \
                SELECT f.id FROM folders f INNER JOIN tree t ON f.parent_id = t.id \
             ) UPDATE folders SET path = $3 || substr(path, char_length($2) + 1), updated_at = NOW() \
             WHERE id IN (SELECT id FROM tree)",
        )
        .bind(id)
        .bind(&old_path)
        .bind(&new_path)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to rewrite descendant paths", e)
        })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit folder relocation", e)
        })?;
        Ok(folder)
    }

    async fn set_color(&self, id: Uuid, color: Option<&str>) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>(
            "UPDATE folders SET color = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(color)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to set folder color", e))?
        .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
    }
}
