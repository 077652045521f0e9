//! Public projection of a share link.
//!
//! This is everything an anonymous visitor may learn about a link: no
//! password hash, no storage key and no owner identity beyond a stub.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::SharePermission;
use crate::permission::model::ResourceType;

/// Minimal public profile of the link owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerProfile {
    /// Owner's account ID.
    pub id: Uuid,
}

/// One visible entry of a shared folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedEntry {
    /// File or folder ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// `file` or `folder`.
    pub resource_type: ResourceType,
    /// Size (files only).
    pub size_bytes: Option<i64>,
    /// MIME type (files only).
    pub content_type: Option<String>,
}

/// What `issue_view` returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicShareView {
    /// Share ID.
    pub share_id: Uuid,
    /// Kind of the shared resource.
    pub resource_type: ResourceType,
    /// Name of the shared file or folder.
    pub name: String,
    /// Size for file links.
    pub size_bytes: Option<i64>,
    /// MIME type for file links.
    pub content_type: Option<String>,
    /// Direct children for folder links.
    pub entries: Vec<SharedEntry>,
    /// Permission level.
    pub permission: SharePermission,
    /// Whether download is allowed.
    pub allow_download: bool,
    /// Description.
    pub description: Option<String>,
    /// Expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Downloads left (None = unlimited).
    pub remaining_downloads: Option<i32>,
    /// Owner stub.
    pub owner: OwnerProfile,
}
