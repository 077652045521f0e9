//! The set of persistence stores a service layer runs on.

use std::sync::Arc;

use filehub_database::connection::PgStores;
use filehub_database::memory::MemoryDatabase;
use filehub_database::store::{
    CollaboratorStore, FileStore, FolderStore, ShareLinkStore, TrashStore,
};

/// Trait objects for every store, shared by all services.
#[derive(Debug, Clone)]
pub struct Stores {
    /// File metadata.
    pub files: Arc<dyn FileStore>,
    /// Folders.
    pub folders: Arc<dyn FolderStore>,
    /// Share links.
    pub share_links: Arc<dyn ShareLinkStore>,
    /// Collaborator grants.
    pub collaborators: Arc<dyn CollaboratorStore>,
    /// Trash lifecycle.
    pub trash: Arc<dyn TrashStore>,
}

impl Stores {
    /// Stores backed by PostgreSQL repositories.
    pub fn postgres(pg: PgStores) -> Self {
        Self {
            files: Arc::new(pg.files),
            folders: Arc::new(pg.folders),
            share_links: Arc::new(pg.share_links),
            collaborators: Arc::new(pg.collaborators),
            trash: Arc::new(pg.trash),
        }
    }

    /// Stores backed by one in-memory database.
    pub fn memory(db: MemoryDatabase) -> Self {
        Self {
            files: Arc::new(db.clone()),
            folders: Arc::new(db.clone()),
            share_links: Arc::new(db.clone()),
            collaborators: Arc::new(db.clone()),
            trash: Arc::new(db),
        }
    }
}
