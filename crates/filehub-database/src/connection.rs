//! PostgreSQL connection pool management.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use filehub_core::config::DatabaseConfig;
use filehub_core::error::{AppError, ErrorKind};

use crate::migration::run_migrations;
use crate::repositories::{
    CollaboratorRepository, FileRepository, FolderRepository, ShareLinkRepository, TrashRepository,
};

/// Wrapper around the sqlx PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

/// One repository per store trait, all sharing a pool.
#[derive(Debug, Clone)]
pub struct PgStores {
    /// File metadata.
    pub files: FileRepository,
    /// Folders.
    pub folders: FolderRepository,
    /// Share links.
    pub share_links: ShareLinkRepository,
    /// Collaborator grants.
    pub collaborators: CollaboratorRepository,
    /// Trash lifecycle.
    pub trash: TrashRepository,
}

impl DatabasePool {
    /// Connect using `config`, applying migrations when enabled.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!(
            url = %mask_password(&config.url),
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to connect to database: {e}"),
                    e,
                )
            })?;

        if config.run_migrations {
            run_migrations(&pool).await?;
        } else {
            info!("Skipping migrations (database.run_migrations = false)");
        }

        Ok(Self { pool })
    }

    /// The underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Build the PostgreSQL repositories over this pool.
    pub fn stores(&self) -> PgStores {
        PgStores {
            files: FileRepository::new(self.pool.clone()),
            folders: FolderRepository::new(self.pool.clone()),
            share_links: ShareLinkRepository::new(self.pool.clone()),
            collaborators: CollaboratorRepository::new(self.pool.clone()),
            trash: TrashRepository::new(self.pool.clone()),
        }
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Health check failed", e))
    }

    /// Close all connections.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

/// Hide the password of a connection URL.
fn mask_password(url: &str) -> String {
    let Some(at_pos) = url.rfind('@') else {
        return url.to_string();
    };
    let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
    match url[..at_pos].rfind(':') {
        Some(colon_pos) if colon_pos > scheme_end => {
            format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password() {
        assert_eq!(
            mask_password("postgres://filehub:s3cr3t@db:5432/filehub"),
            "postgres://filehub:****@db:5432/filehub"
        );
        assert_eq!(
            mask_password("postgres://db:5432/filehub"),
            "postgres://db:5432/filehub"
        );
        assert_eq!(
            mask_password("postgres://filehub@db/filehub"),
            "postgres://filehub@db/filehub"
        );
    }
}
