//! File and folder domain events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events related to file and folder operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FileEvent {
    /// A file was uploaded.
    Uploaded {
        /// The file ID.
        file_id: Uuid,
        /// The folder containing the file (None = root).
        folder_id: Option<Uuid>,
        /// The file name.
        name: String,
        /// The file size in bytes.
        size_bytes: i64,
    },
    /// A file was downloaded by an authenticated user.
    Downloaded {
        /// The file ID.
        file_id: Uuid,
    },
    /// File metadata changed.
    Updated {
        /// The file ID.
        file_id: Uuid,
        /// Fields that changed.
        changed_fields: Vec<String>,
    },
    /// A file was moved.
    Moved {
        /// The file ID.
        file_id: Uuid,
        /// The source folder.
        from_folder_id: Option<Uuid>,
        /// The destination folder.
        to_folder_id: Option<Uuid>,
    },
    /// A folder was created.
    FolderCreated {
        /// The folder ID.
        folder_id: Uuid,
        /// Materialized path.
        path: String,
    },
    /// A folder was renamed or moved.
    FolderRelocated {
        /// The folder ID.
        folder_id: Uuid,
        /// Previous path.
        old_path: String,
        /// New path.
        new_path: String,
    },
}

impl FileEvent {
    /// Action name for audit records.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Uploaded { .. } => "file.uploaded",
            Self::Downloaded { .. } => "file.downloaded",
            Self::Updated { .. } => "file.updated",
            Self::Moved { .. } => "file.moved",
            Self::FolderCreated { .. } => "folder.created",
            Self::FolderRelocated { .. } => "folder.relocated",
        }
    }
}
