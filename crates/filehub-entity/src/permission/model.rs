//! Collaborator grant entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use filehub_core::error::AppError;

use super::role::CollaboratorRole;

/// Kind of resource a grant or share link is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// A file resource.
    File,
    /// A folder resource.
    Folder,
}

impl ResourceType {
    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reference to exactly one file or one folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ResourceRef {
    /// A file.
    File(Uuid),
    /// A folder.
    Folder(Uuid),
}

impl ResourceRef {
    /// Build from the pair of nullable columns used in storage.
    ///
    /// Exactly one of the two must be set.
    pub fn from_columns(file_id: Option<Uuid>, folder_id: Option<Uuid>) -> Result<Self, AppError> {
        match (file_id, folder_id) {
            (Some(id), None) => Ok(Self::File(id)),
            (None, Some(id)) => Ok(Self::Folder(id)),
            _ => Err(AppError::inconsistent(
                "Record must reference exactly one of file_id or folder_id",
            )),
        }
    }

    /// The resource ID.
    pub fn id(&self) -> Uuid {
        match self {
            Self::File(id) | Self::Folder(id) => *id,
        }
    }

    /// The resource kind.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::File(_) => ResourceType::File,
            Self::Folder(_) => ResourceType::Folder,
        }
    }

    /// `file_id` column value.
    pub fn file_id(&self) -> Option<Uuid> {
        match self {
            Self::File(id) => Some(*id),
            Self::Folder(_) => None,
        }
    }

    /// `folder_id` column value.
    pub fn folder_id(&self) -> Option<Uuid> {
        match self {
            Self::Folder(id) => Some(*id),
            Self::File(_) => None,
        }
    }
}

/// A role-scoped permission binding one user to one file or folder.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Collaborator {
    /// Unique grant identifier.
    pub id: Uuid,
    /// Grantee.
    pub user_id: Uuid,
    /// Bound file, if this is a file grant.
    pub file_id: Option<Uuid>,
    /// Bound folder, if this is a folder grant.
    pub folder_id: Option<Uuid>,
    /// Granted role.
    pub role: CollaboratorRole,
    /// When the grant stops applying.
    pub expires_at: Option<DateTime<Utc>>,
    /// Who created the grant.
    pub granted_by: Uuid,
    /// When the grant was created.
    pub created_at: DateTime<Utc>,
    /// When the grant was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Collaborator {
    /// The resource this grant is bound to.
    pub fn resource(&self) -> Result<ResourceRef, AppError> {
        ResourceRef::from_columns(self.file_id, self.folder_id)
    }

    /// Whether the grant has lapsed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Data for creating or replacing the grant of a (resource, user) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertCollaborator {
    /// Bound resource.
    pub resource: ResourceRef,
    /// Grantee.
    pub user_id: Uuid,
    /// Role.
    pub role: CollaboratorRole,
    /// Expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Granting user.
    pub granted_by: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_ref_from_columns() {
        let id = Uuid::new_v4();
        assert_eq!(
            ResourceRef::from_columns(Some(id), None).unwrap(),
            ResourceRef::File(id)
        );
        assert_eq!(
            ResourceRef::from_columns(None, Some(id)).unwrap().folder_id(),
            Some(id)
        );
        assert!(ResourceRef::from_columns(Some(id), Some(id)).is_err());
        assert!(ResourceRef::from_columns(None, None).is_err());
    }
}
