//! Share link entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use filehub_core::error::AppError;

use crate::permission::model::ResourceRef;

/// Permission level carried by a share link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "share_permission", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SharePermission {
    /// Read-only.
    View,
    /// Read and comment.
    Comment,
    /// Read and edit.
    Edit,
}

/// A capability token granting access to one file or one folder.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShareLink {
    /// Unique share identifier.
    pub id: Uuid,
    /// User who created the link.
    pub created_by: Uuid,
    /// Shared file, for file links.
    pub file_id: Option<Uuid>,
    /// Shared folder, for folder links.
    pub folder_id: Option<Uuid>,
    /// Secret access token.
    pub token: String,
    /// Argon2 PHC hash of the link password.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Permission level granted.
    pub permission: SharePermission,
    /// Whether byte downloads are allowed.
    pub allow_download: bool,
    /// Free-text description.
    pub description: Option<String>,
    /// When the link expires (None = never).
    pub expires_at: Option<DateTime<Utc>>,
    /// Download quota (0 = unlimited).
    pub max_downloads: i32,
    /// Downloads served so far.
    pub download_count: i32,
    /// Metadata views served so far.
    pub view_count: i32,
    /// Whether the owner has left the link enabled.
    pub is_active: bool,
    /// Last successful view or download.
    pub last_accessed_at: Option<DateTime<Utc>>,
    /// When the link was created.
    pub created_at: DateTime<Utc>,
    /// When the link was last updated.
    pub updated_at: DateTime<Utc>,
}

impl ShareLink {
    /// The shared resource.
    pub fn resource(&self) -> Result<ResourceRef, AppError> {
        ResourceRef::from_columns(self.file_id, self.folder_id)
    }

    /// Whether the expiry has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    /// Whether the download quota is used up.
    pub fn is_quota_exhausted(&self) -> bool {
        self.max_downloads > 0 && self.download_count >= self.max_downloads
    }

    /// Active, unexpired and under quota.
    pub fn is_accessible(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now) && !self.is_quota_exhausted()
    }

    /// Whether a password must be supplied.
    pub fn requires_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Downloads left, or `None` when unlimited.
    pub fn remaining_downloads(&self) -> Option<i32> {
        (self.max_downloads > 0).then(|| (self.max_downloads - self.download_count).max(0))
    }
}

/// Data required to persist a new share link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShareLink {
    /// Creator.
    pub created_by: Uuid,
    /// Shared resource.
    pub resource: ResourceRef,
    /// Secret token.
    pub token: String,
    /// Password hash.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Permission level.
    pub permission: SharePermission,
    /// Allow downloads.
    pub allow_download: bool,
    /// Description.
    pub description: Option<String>,
    /// Expiry time (None = never).
    pub expires_at: Option<DateTime<Utc>>,
    /// Download quota (0 = unlimited).
    pub max_downloads: i32,
}

/// Changes applied to a share link. `None` leaves a field untouched;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateShareLink {
    /// New password hash.
    #[serde(skip_serializing)]
    pub password_hash: Option<Option<String>>,
    /// New permission.
    pub permission: Option<SharePermission>,
    /// New allow-download flag.
    pub allow_download: Option<bool>,
    /// New description.
    pub description: Option<Option<String>>,
    /// New expiry.
    pub expires_at: Option<Option<DateTime<Utc>>>,
    /// New quota.
    pub max_downloads: Option<i32>,
    /// New active flag.
    pub is_active: Option<bool>,
}
