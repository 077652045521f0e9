//! Collaborator role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role granted to a collaborator.
///
/// Ordered by privilege: Viewer < Commenter < Editor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "collaborator_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CollaboratorRole {
    /// Can view and download.
    Viewer,
    /// Can view and comment.
    Commenter,
    /// Can edit metadata, upload into and reorganize.
    Editor,
}

impl CollaboratorRole {
    /// Return the privilege level (higher = more privileged).
    pub fn privilege_level(&self) -> u8 {
        match self {
            Self::Viewer => 1,
            Self::Commenter => 2,
            Self::Editor => 3,
        }
    }

    /// Check if this role grants at least the given level.
    pub fn has_at_least(&self, required: CollaboratorRole) -> bool {
        self.privilege_level() >= required.privilege_level()
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Commenter => "commenter",
            Self::Editor => "editor",
        }
    }
}

impl fmt::Display for CollaboratorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CollaboratorRole {
    type Err = filehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "viewer" => Ok(Self::Viewer),
            "commenter" => Ok(Self::Commenter),
            "editor" => Ok(Self::Editor),
            _ => Err(filehub_core::AppError::validation(format!(
                "Invalid collaborator role: '{s}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(CollaboratorRole::Viewer < CollaboratorRole::Commenter);
        assert!(CollaboratorRole::Commenter < CollaboratorRole::Editor);
        assert!(CollaboratorRole::Editor.has_at_least(CollaboratorRole::Viewer));
        assert!(!CollaboratorRole::Viewer.has_at_least(CollaboratorRole::Commenter));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(
            "Editor".parse::<CollaboratorRole>().unwrap(),
            CollaboratorRole::Editor
        );
        assert!("owner".parse::<CollaboratorRole>().is_err());
    }
}
