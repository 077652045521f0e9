//! Trash lifecycle repository implementation.
//!
//! Subtree operations walk the folder adjacency with an explicit worklist
//! inside a single transaction, so a failure anywhere rolls the whole
//! subtree back.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use filehub_core::error::{AppError, ErrorKind};
use filehub_core::result::AppResult;
use filehub_core::types::pagination::{PageRequest, PageResponse};
use filehub_entity::file::File;
use filehub_entity::folder::Folder;

use crate::store::{PurgedRecords, SubtreeChange, TrashListing, TrashStore};

/// Which children the worklist descends into.
#[derive(Debug, Clone, Copy)]
enum Descend {
    /// Children that are not trashed.
    Active,
    /// Children trashed at exactly this instant.
    TrashedAt(DateTime<Utc>),
    /// Every child.
    All,
}

/// Repository for trash, restore and purge.
#[derive(Debug, Clone)]
pub struct TrashRepository {
    pool: PgPool,
}

impl TrashRepository {
    /// Create a new trash repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })
    }
}

fn db(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, context, e)
}

async fn commit(tx: Transaction<'static, Postgres>) -> AppResult<()> {
    tx.commit().await.map_err(db("Failed to commit trash transaction"))
}

/// Root folder first, every folder after its parent.
async fn collect_subtree(
    conn: &mut PgConnection,
    root: Uuid,
    descend: Descend,
) -> AppResult<Vec<Uuid>> {
    let mut order = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        order.push(id);
        let children: Vec<Uuid> = match descend {
            Descend::Active => {
                sqlx::query_scalar("SELECT id FROM folders WHERE parent_id = $1 AND NOT is_trashed")
                    .bind(id)
                    .fetch_all(&mut *conn)
                    .await
            }
            Descend::TrashedAt(at) => {
                sqlx::query_scalar(
                    "SELECT id FROM folders WHERE parent_id = $1 AND is_trashed AND trashed_at = $2",
                )
                .bind(id)
                .bind(at)
                .fetch_all(&mut *conn)
                .await
            }
            Descend::All => {
                sqlx::query_scalar("SELECT id FROM folders WHERE parent_id = $1")
                    .bind(id)
                    .fetch_all(&mut *conn)
                    .await
            }
        }
        .map_err(db("Failed to walk folder subtree"))?;
        stack.extend(children);
    }
    Ok(order)
}

async fn lock_folder(conn: &mut PgConnection, owner_id: Uuid, folder_id: Uuid) -> AppResult<Folder> {
    sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1 AND owner_id = $2 FOR UPDATE")
        .bind(folder_id)
        .bind(owner_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db("Failed to lock folder"))?
        .ok_or_else(|| AppError::not_found(format!("Folder {folder_id} not found")))
}

async fn lock_file(conn: &mut PgConnection, owner_id: Uuid, file_id: Uuid) -> AppResult<File> {
    sqlx::query_as::<_, File>("SELECT * FROM files WHERE id = $1 AND owner_id = $2 FOR UPDATE")
        .bind(file_id)
        .bind(owner_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db("Failed to lock file"))?
        .ok_or_else(|| AppError::not_found(format!("File {file_id} not found")))
}

async fn ensure_parent_live(conn: &mut PgConnection, parent_id: Option<Uuid>) -> AppResult<()> {
    let Some(parent_id) = parent_id else {
        return Ok(());
    };
    let trashed: Option<bool> = sqlx::query_scalar("SELECT is_trashed FROM folders WHERE id = $1")
        .bind(parent_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(db("Failed to check parent folder"))?;
    match trashed {
        Some(false) => Ok(()),
        Some(true) => Err(AppError::conflict(
            "Parent folder is in the trash; restore it first",
        )),
        None => Err(AppError::inconsistent(format!(
            "Parent folder {parent_id} does not exist"
        ))),
    }
}

/// Delete the given folder subtrees plus the files matched by `extra_files`,
/// files first, then folders.
async fn purge_subtrees(
    conn: &mut PgConnection,
    roots: &[Uuid],
    extra_files: &[Uuid],
) -> AppResult<PurgedRecords> {
    let mut folder_ids: Vec<Uuid> = Vec::new();
    let mut seen = HashSet::new();
    for root in roots {
        if seen.contains(root) {
            continue;
        }
        for id in collect_subtree(&mut *conn, *root, Descend::All).await? {
            if seen.insert(id) {
                folder_ids.push(id);
            }
        }
    }

    let storage_keys: Vec<String> = sqlx::query_scalar(
        "DELETE FROM files WHERE folder_id = ANY($1) OR id = ANY($2) RETURNING storage_key",
    )
    .bind(&folder_ids)
    .bind(extra_files)
    .fetch_all(&mut *conn)
    .await
    .map_err(db("Failed to purge files"))?;

    folder_ids.reverse();
    let folders = sqlx::query("DELETE FROM folders WHERE id = ANY($1)")
        .bind(&folder_ids)
        .execute(&mut *conn)
        .await
        .map_err(db("Failed to purge folders"))?
        .rows_affected();

    Ok(PurgedRecords {
        folders,
        files: storage_keys.len() as u64,
        storage_keys,
    })
}

#[async_trait]
impl TrashStore for TrashRepository {
    async fn trash_file(&self, owner_id: Uuid, file_id: Uuid, at: DateTime<Utc>) -> AppResult<u64> {
        let mut tx = self.begin().await?;
        let file = lock_file(&mut tx, owner_id, file_id).await?;
        if file.is_trashed {
            return Ok(0);
        }
        let changed = sqlx::query(
            "UPDATE files SET is_trashed = TRUE, trashed_at = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(file_id)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(db("Failed to trash file"))?
        .rows_affected();
        commit(tx).await?;
        Ok(changed)
    }

    async fn trash_folder(
        &self,
        owner_id: Uuid,
        folder_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<SubtreeChange> {
        let mut tx = self.begin().await?;
        let root = lock_folder(&mut tx, owner_id, folder_id).await?;
        if root.is_trashed {
            return Ok(SubtreeChange::default());
        }

        let ids = collect_subtree(&mut tx, root.id, Descend::Active).await?;
        let folders = sqlx::query(
            "UPDATE folders SET is_trashed = TRUE, trashed_at = $2, updated_at = NOW() \
             WHERE id = ANY($1) AND NOT is_trashed",
        )
        .bind(&ids)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(db("Failed to trash folders"))?
        .rows_affected();
        let files = sqlx::query(
            "UPDATE files SET is_trashed = TRUE, trashed_at = $2, updated_at = NOW() \
             WHERE folder_id = ANY($1) AND NOT is_trashed",
        )
        .bind(&ids)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(db("Failed to trash files"))?
        .rows_affected();

        commit(tx).await?;
        Ok(SubtreeChange { folders, files })
    }

    async fn restore_file(&self, owner_id: Uuid, file_id: Uuid) -> AppResult<u64> {
        let mut tx = self.begin().await?;
        let file = lock_file(&mut tx, owner_id, file_id).await?;
        if !file.is_trashed {
            return Err(AppError::not_found(format!("File {file_id} is not in the trash")));
        }
        ensure_parent_live(&mut tx, file.folder_id).await?;
        let changed = sqlx::query(
            "UPDATE files SET is_trashed = FALSE, trashed_at = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(file_id)
        .execute(&mut *tx)
        .await
        .map_err(db("Failed to restore file"))?
        .rows_affected();
        commit(tx).await?;
        Ok(changed)
    }

    async fn restore_folder(&self, owner_id: Uuid, folder_id: Uuid) -> AppResult<SubtreeChange> {
        let mut tx = self.begin().await?;
        let root = lock_folder(&mut tx, owner_id, folder_id).await?;
        let Some(at) = root.trashed_at.filter(|_| root.is_trashed) else {
            return Err(AppError::not_found(format!(
                "Folder {folder_id} is not in the trash"
            )));
        };
        ensure_parent_live(&mut tx, root.parent_id).await?;

        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM folders \
             WHERE owner_id = $1 AND parent_id IS NOT DISTINCT FROM $2 AND name = $3 \
             AND NOT is_trashed AND id <> $4)",
        )
        .bind(owner_id)
        .bind(root.parent_id)
        .bind(&root.name)
        .bind(root.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db("Failed to check sibling names"))?;
        if taken {
            return Err(AppError::conflict(format!(
                "A folder named '{}' already exists at the restore location",
                root.name
            )));
        }

        let ids = collect_subtree(&mut tx, root.id, Descend::TrashedAt(at)).await?;
        let folders = sqlx::query(
            "UPDATE folders SET is_trashed = FALSE, trashed_at = NULL, updated_at = NOW() \
             WHERE id = ANY($1)",
        )
        .bind(&ids)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            super::map_unique(
                e,
                "folders_active_sibling_name_key",
                || format!("A folder named '{}' already exists", root.name),
                "Failed to restore folders",
            )
        })?
        .rows_affected();
        let files = sqlx::query(
            "UPDATE files SET is_trashed = FALSE, trashed_at = NULL, updated_at = NOW() \
             WHERE folder_id = ANY($1) AND is_trashed AND trashed_at = $2",
        )
        .bind(&ids)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(db("Failed to restore files"))?
        .rows_affected();

        commit(tx).await?;
        Ok(SubtreeChange { folders, files })
    }

    async fn list_trashed(&self, owner_id: Uuid, page: &PageRequest) -> AppResult<TrashListing> {
        let total_files: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE owner_id = $1 AND is_trashed")
                .bind(owner_id)
                .fetch_one(&self.pool)
                .await
                .map_err(db("Failed to count trashed files"))?;
        let files = sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE owner_id = $1 AND is_trashed \
             ORDER BY trashed_at DESC, name ASC LIMIT $2 OFFSET $3",
        )
        .bind(owner_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to list trashed files"))?;

        let total_folders: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM folders WHERE owner_id = $1 AND is_trashed")
                .bind(owner_id)
                .fetch_one(&self.pool)
                .await
                .map_err(db("Failed to count trashed folders"))?;
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE owner_id = $1 AND is_trashed \
             ORDER BY trashed_at DESC, path ASC LIMIT $2 OFFSET $3",
        )
        .bind(owner_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db("Failed to list trashed folders"))?;

        Ok(TrashListing {
            files: PageResponse::new(files, page.page, page.page_size, total_files as u64),
            folders: PageResponse::new(folders, page.page, page.page_size, total_folders as u64),
        })
    }

    async fn purge_file(&self, owner_id: Uuid, file_id: Uuid) -> AppResult<PurgedRecords> {
        let mut tx = self.begin().await?;
        let file = lock_file(&mut tx, owner_id, file_id).await?;
        if !file.is_trashed {
            return Err(AppError::not_found(format!("File {file_id} is not in the trash")));
        }
        let purged = purge_subtrees(&mut tx, &[], &[file.id]).await?;
        commit(tx).await?;
        Ok(purged)
    }

    async fn purge_folder(&self, owner_id: Uuid, folder_id: Uuid) -> AppResult<PurgedRecords> {
        let mut tx = self.begin().await?;
        let root = lock_folder(&mut tx, owner_id, folder_id).await?;
        if !root.is_trashed {
            return Err(AppError::not_found(format!(
                "Folder {folder_id} is not in the trash"
            )));
        }
        let purged = purge_subtrees(&mut tx, &[root.id], &[]).await?;
        commit(tx).await?;
        Ok(purged)
    }

    async fn purge_all(&self, owner_id: Uuid) -> AppResult<PurgedRecords> {
        let mut tx = self.begin().await?;
        let roots: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM folders WHERE owner_id = $1 AND is_trashed FOR UPDATE",
        )
        .bind(owner_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db("Failed to find trashed folders"))?;
        let files: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM files WHERE owner_id = $1 AND is_trashed FOR UPDATE",
        )
        .bind(owner_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db("Failed to find trashed files"))?;

        let purged = purge_subtrees(&mut tx, &roots, &files).await?;
        commit(tx).await?;
        Ok(purged)
    }

    async fn purge_trashed_before(&self, cutoff: DateTime<Utc>) -> AppResult<PurgedRecords> {
        let mut tx = self.begin().await?;
        let roots: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM folders WHERE is_trashed AND trashed_at < $1 FOR UPDATE",
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await
        .map_err(db("Failed to find expired folders"))?;
        let files: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM files WHERE is_trashed AND trashed_at < $1 FOR UPDATE",
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await
        .map_err(db("Failed to find expired files"))?;

        let purged = purge_subtrees(&mut tx, &roots, &files).await?;
        commit(tx).await?;
        Ok(purged)
    }
}
