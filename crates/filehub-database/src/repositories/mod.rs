//! PostgreSQL implementations of the persistence traits.

pub mod collaborator;
pub mod file;
pub mod folder;
pub mod share;
pub mod trash;

pub use collaborator::CollaboratorRepository;
pub use file::FileRepository;
pub use folder::FolderRepository;
pub use share::ShareLinkRepository;
pub use trash::TrashRepository;

use filehub_core::error::{AppError, ErrorKind};

/// Map a sqlx error, turning a violation of `constraint` into a conflict.
pub(crate) fn map_unique(
    e: sqlx::Error,
    constraint: &str,
    conflict_message: impl FnOnce() -> String,
    context: &'static str,
) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.constraint() == Some(constraint) => {
            AppError::conflict(conflict_message())
        }
        _ => AppError::with_source(ErrorKind::Database, context, e),
    }
}
