//! Share link and collaborator domain events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events related to sharing operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShareEvent {
    /// A share link was created.
    Created {
        /// The share ID.
        share_id: Uuid,
        /// `"file"` or `"folder"`.
        resource_type: String,
        /// The resource ID.
        resource_id: Uuid,
    },
    /// Share metadata was disclosed.
    Viewed {
        /// The share ID.
        share_id: Uuid,
        /// View count after the increment.
        view_count: i32,
    },
    /// A shared file was downloaded.
    Downloaded {
        /// The share ID.
        share_id: Uuid,
        /// The file that was downloaded.
        file_id: Uuid,
        /// Download count after the increment.
        download_count: i32,
    },
    /// An access attempt was refused.
    AccessDenied {
        /// The share ID, if the token resolved.
        share_id: Option<Uuid>,
        /// Accessor IP address, if known.
        ip_address: Option<String>,
    },
    /// A share link was updated.
    Updated {
        /// The share ID.
        share_id: Uuid,
    },
    /// A share link was deactivated.
    Revoked {
        /// The share ID.
        share_id: Uuid,
    },
    /// A share link was deleted.
    Deleted {
        /// The share ID.
        share_id: Uuid,
    },
    /// A collaborator grant was created or replaced.
    CollaboratorGranted {
        /// Grant ID.
        collaborator_id: Uuid,
        /// Grantee.
        user_id: Uuid,
        /// Role name.
        role: String,
    },
    /// A collaborator grant was removed.
    CollaboratorRemoved {
        /// Grant ID.
        collaborator_id: Uuid,
    },
}

impl ShareEvent {
    /// Action name for audit records.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Created { .. } => "share.created",
            Self::Viewed { .. } => "share.viewed",
            Self::Downloaded { .. } => "share.downloaded",
            Self::AccessDenied { .. } => "share.access_denied",
            Self::Updated { .. } => "share.updated",
            Self::Revoked { .. } => "share.revoked",
            Self::Deleted { .. } => "share.deleted",
            Self::CollaboratorGranted { .. } => "collaborator.granted",
            Self::CollaboratorRemoved { .. } => "collaborator.removed",
        }
    }
}
