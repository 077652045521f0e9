//! Trash lifecycle domain events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events related to trash, restore and purge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrashEvent {
    /// Items were moved to the trash.
    Trashed {
        /// Root of the operation.
        resource_id: Uuid,
        /// Number of folder records changed.
        folders: u64,
        /// Number of file records changed.
        files: u64,
    },
    /// Items were restored from the trash.
    Restored {
        /// Root of the operation.
        resource_id: Uuid,
        /// Number of folder records changed.
        folders: u64,
        /// Number of file records changed.
        files: u64,
    },
    /// Items were permanently deleted.
    Purged {
        /// Root of the operation (None for empty-trash and sweeps).
        resource_id: Option<Uuid>,
        /// Number of folder records deleted.
        folders: u64,
        /// Number of file records deleted.
        files: u64,
        /// Storage objects that could not be removed.
        orphaned_objects: u64,
    },
}

impl TrashEvent {
    /// Action name for audit records.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Trashed { .. } => "trash.trashed",
            Self::Restored { .. } => "trash.restored",
            Self::Purged { .. } => "trash.purged",
        }
    }
}
