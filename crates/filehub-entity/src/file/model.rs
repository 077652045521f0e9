//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A file stored in FileHub.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: Uuid,
    /// The file owner.
    pub owner_id: Uuid,
    /// The folder containing this file (None = owner's root).
    pub folder_id: Option<Uuid>,
    /// Display name as uploaded.
    pub name: String,
    /// Opaque object store key.
    #[serde(skip_serializing)]
    pub storage_key: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// MIME type of the file.
    pub content_type: String,
    /// Lowercase extension without the dot.
    pub extension: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Readable by anonymous principals.
    pub is_public: bool,
    /// Starred by the owner.
    pub is_starred: bool,
    /// Soft-deleted.
    pub is_trashed: bool,
    /// When the file entered the trash.
    pub trashed_at: Option<DateTime<Utc>>,
    /// Aggregate download counter across all access paths.
    pub download_count: i64,
    /// When the file was created.
    pub created_at: DateTime<Utc>,
    /// When the file was last updated.
    pub updated_at: DateTime<Utc>,
}

impl File {
    /// `is_trashed` and `trashed_at` agree.
    pub fn trash_state_consistent(&self) -> bool {
        self.is_trashed == self.trashed_at.is_some()
    }

    /// Extract the lowercase extension of a file name, if any.
    pub fn extension_of(name: &str) -> Option<String> {
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() || ext.len() > 16 {
            return None;
        }
        ext.chars()
            .all(|c| c.is_ascii_alphanumeric())
            .then(|| ext.to_ascii_lowercase())
    }
}

/// Data required to create a new file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    /// Pre-allocated file ID (also used in the storage key).
    pub id: Uuid,
    /// The file owner.
    pub owner_id: Uuid,
    /// The folder to place the file in.
    pub folder_id: Option<Uuid>,
    /// Display name.
    pub name: String,
    /// Object store key the bytes were written to.
    pub storage_key: String,
    /// File size in bytes.
    pub size_bytes: i64,
    /// MIME type.
    pub content_type: String,
    /// Lowercase extension.
    pub extension: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Initial public flag.
    pub is_public: bool,
}

/// Metadata changes applied to a file. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFile {
    /// New display name.
    pub name: Option<String>,
    /// New description (`Some(None)` clears it).
    pub description: Option<Option<String>>,
    /// New public flag.
    pub is_public: Option<bool>,
    /// New starred flag.
    pub is_starred: Option<bool>,
}

impl UpdateFile {
    /// Names of the fields this update touches.
    pub fn changed_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name".to_string());
        }
        if self.description.is_some() {
            fields.push("description".to_string());
        }
        if self.is_public.is_some() {
            fields.push("is_public".to_string());
        }
        if self.is_starred.is_some() {
            fields.push("is_starred".to_string());
        }
        fields
    }
}
