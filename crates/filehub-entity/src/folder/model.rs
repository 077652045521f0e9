//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::path;

/// A folder in the file hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: Uuid,
    /// The folder owner.
    pub owner_id: Uuid,
    /// Parent folder ID (null for root folders).
    pub parent_id: Option<Uuid>,
    /// Folder name.
    pub name: String,
    /// Full materialized path (e.g., `/documents/reports`).
    pub path: String,
    /// Hex color tag (`#rrggbb`).
    pub color: Option<String>,
    /// Soft-deleted.
    pub is_trashed: bool,
    /// When the folder entered the trash.
    pub trashed_at: Option<DateTime<Utc>>,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Check if this is a root folder (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Depth in the tree (0 for root folders).
    pub fn depth(&self) -> usize {
        path::depth(&self.path)
    }

    /// Whether `other` lies inside this folder's subtree (or is this folder).
    pub fn contains(&self, other: &Folder) -> bool {
        self.id == other.id || path::is_same_or_descendant(&other.path, &self.path)
    }
}

/// Data required to create a new folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolder {
    /// The folder owner.
    pub owner_id: Uuid,
    /// Parent folder (None for root).
    pub parent_id: Option<Uuid>,
    /// Folder name.
    pub name: String,
    /// Full materialized path.
    pub path: String,
    /// Color tag.
    pub color: Option<String>,
}
