//! Share link repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use filehub_core::error::{AppError, ErrorKind};
use filehub_core::result::AppResult;
use filehub_core::types::pagination::{PageRequest, PageResponse};
use filehub_entity::share::{CreateShareLink, ShareLink, UpdateShareLink};

use crate::store::ShareLinkStore;

/// Guard shared by every counter increment: active, unexpired, under quota.
const ACCESSIBLE: &str = "is_active \
    AND (expires_at IS NULL OR expires_at > $2) \
    AND (max_downloads = 0 OR download_count < max_downloads)";

/// Repository for share links and their access counters.
#[derive(Debug, Clone)]
pub struct ShareLinkRepository {
    pool: PgPool,
}

impl ShareLinkRepository {
    /// Create a new share link repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareLinkStore for ShareLinkRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<ShareLink>> {
        sqlx::query_as::<_, ShareLink>("SELECT * FROM share_links WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find share link", e))
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<ShareLink>> {
        sqlx::query_as::<_, ShareLink>("SELECT * FROM share_links WHERE token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find share link by token", e)
            })
    }

    async fn list_by_creator(
        &self,
        user_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<PageResponse<ShareLink>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM share_links WHERE created_by = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count share links", e)
                })?;

        let links = sqlx::query_as::<_, ShareLink>(
            "SELECT * FROM share_links WHERE created_by = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list share links", e))?;

        Ok(PageResponse::new(links, page.page, page.page_size, total as u64))
    }

    async fn create(&self, data: &CreateShareLink) -> AppResult<ShareLink> {
        sqlx::query_as::<_, ShareLink>(
            "INSERT INTO share_links (created_by, file_id, folder_id, token, password_hash, \
             permission, allow_download, description, expires_at, max_downloads) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
        .bind(data.created_by)
        .bind(data.resource.file_id())
        .bind(data.resource.folder_id())
        .bind(&data.token)
        .bind(&data.password_hash)
        .bind(data.permission)
        .bind(data.allow_download)
        .bind(&data.description)
        .bind(data.expires_at)
        .bind(data.max_downloads)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            super::map_unique(
                e,
                "share_links_token_key",
                || "Share token already in use".to_string(),
                "Failed to create share link",
            )
        })
    }

    async fn update(&self, id: Uuid, data: &UpdateShareLink) -> AppResult<ShareLink> {
        sqlx::query_as::<_, ShareLink>(
            "UPDATE share_links SET \
                password_hash = CASE WHEN $2 THEN $3 ELSE password_hash END, \
                permission = COALESCE($4, permission), \
                allow_download = COALESCE($5, allow_download), \
                description = CASE WHEN $6 THEN $7 ELSE description END, \
                expires_at = CASE WHEN $8 THEN $9 ELSE expires_at END, \
                max_downloads = COALESCE($10, max_downloads), \
                is_active = COALESCE($11, is_active), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(data.password_hash.is_some())
        .bind(data.password_hash.clone().flatten())
        .bind(data.permission)
        .bind(data.allow_download)
        .bind(data.description.is_some())
        .bind(data.description.clone().flatten())
        .bind(data.expires_at.is_some())
        .bind(data.expires_at.flatten())
        .bind(data.max_downloads)
        .bind(data.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update share link", e))?
        .ok_or_else(|| AppError::not_found(format!("Share link {id} not found")))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM share_links WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete share link", e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_download(
        &self,
        share_id: Uuid,
        file_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ShareLink>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        // The row lock taken by this UPDATE serializes concurrent downloads;
        // the guard is re-checked against the committed counter.
        let link = sqlx::query_as::<_, ShareLink>(&format!(
            "UPDATE share_links SET download_count = download_count + 1, \
             last_accessed_at = $2, updated_at = $2 \
             WHERE id = $1 AND {ACCESSIBLE} RETURNING *"
        ))
        .bind(share_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count share download", e)
        })?;

        let Some(link) = link else {
            return Ok(None);
        };

        let bumped = sqlx::query(
            "UPDATE files SET download_count = download_count + 1 \
             WHERE id = $1 AND NOT is_trashed",
        )
        .bind(file_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count file download", e)
        })?;

        if bumped.rows_affected() == 0 {
            // Dropping the transaction rolls the link counter back.
            return Err(AppError::not_found("Shared file not found"));
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit download count", e)
        })?;
        Ok(Some(link))
    }

    async fn record_view(&self, share_id: Uuid, now: DateTime<Utc>) -> AppResult<Option<ShareLink>> {
        sqlx::query_as::<_, ShareLink>(&format!(
            "UPDATE share_links SET view_count = view_count + 1, \
             last_accessed_at = $2, updated_at = $2 \
             WHERE id = $1 AND {ACCESSIBLE} RETURNING *"
        ))
        .bind(share_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count share view", e))
    }
}
