//! # filehub-database
//!
//! Persistence for FileHub sharing: the store traits consumed by the
//! service layer, their PostgreSQL repositories, and an in-memory
//! implementation used by tests and local development.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::{DatabasePool, PgStores};
pub use memory::MemoryDatabase;
pub use store::{
    CollaboratorStore, FileStore, FolderStore, PurgedRecords, ShareLinkStore, SubtreeChange,
    TrashListing, TrashStore,
};
