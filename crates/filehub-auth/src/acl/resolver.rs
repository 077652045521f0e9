//! Permission resolution for files and folders.
//!
//! Resolution is a pure function of the principal, the resource, and the
//! collaborator grants loaded for it. Order:
//! 1. Owner: full access.
//! 2. Collaborator grants on the resource or any ancestor folder: the most
//!    permissive unexpired role.
//! 3. Public resources: viewer access for anyone.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use filehub_entity::permission::{Collaborator, CollaboratorRole, ResourceRef};

/// Who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    /// An authenticated account.
    User {
        /// Account ID.
        id: Uuid,
    },
    /// No identity at all.
    Anonymous,
}

impl Principal {
    /// Authenticated principal for `id`.
    pub fn user(id: Uuid) -> Self {
        Self::User { id }
    }

    /// The account ID, if authenticated.
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::User { id } => Some(*id),
            Self::Anonymous => None,
        }
    }
}

/// What the resolver needs to know about a resource.
#[derive(Debug, Clone)]
pub struct ResourceAccess {
    /// The resource itself.
    pub resource: ResourceRef,
    /// Owning account.
    pub owner_id: Uuid,
    /// Readable by anyone.
    pub is_public: bool,
    /// Enclosing folders whose grants also apply, nearest or farthest first.
    pub inherited_from: Vec<Uuid>,
}

impl ResourceAccess {
    /// Access description for a resource without ancestors.
    pub fn new(resource: ResourceRef, owner_id: Uuid) -> Self {
        Self {
            resource,
            owner_id,
            is_public: false,
            inherited_from: Vec::new(),
        }
    }

    /// Mark as public.
    pub fn public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    /// Add ancestor folders.
    pub fn inheriting(mut self, folders: impl IntoIterator<Item = Uuid>) -> Self {
        self.inherited_from.extend(folders);
        self
    }

    /// Every resource whose grants count for this one.
    pub fn grant_scopes(&self) -> Vec<ResourceRef> {
        std::iter::once(self.resource)
            .chain(self.inherited_from.iter().map(|id| ResourceRef::Folder(*id)))
            .collect()
    }

    fn covers(&self, grant: &Collaborator) -> bool {
        match (grant.file_id, grant.folder_id) {
            (Some(file_id), None) => self.resource == ResourceRef::File(file_id),
            (None, Some(folder_id)) => {
                self.resource == ResourceRef::Folder(folder_id)
                    || self.inherited_from.contains(&folder_id)
            }
            _ => false,
        }
    }
}

/// Effective access a principal holds on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "role", rename_all = "snake_case")]
pub enum AccessLevel {
    /// Nothing.
    None,
    /// Viewer access because the resource is public.
    Public,
    /// A collaborator grant.
    Granted(CollaboratorRole),
    /// The owner.
    Owner,
}

impl AccessLevel {
    /// Whether this level permits an action needing `required`.
    pub fn satisfies(&self, required: CollaboratorRole) -> bool {
        match self {
            Self::Owner => true,
            Self::Granted(role) => role.has_at_least(required),
            Self::Public => required == CollaboratorRole::Viewer,
            Self::None => false,
        }
    }

    /// Whether the principal owns the resource.
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }
}

/// Compute the effective access of `principal` on `resource`.
///
/// `grants` may contain unrelated records; only unexpired grants held by
/// the principal on the resource or its `inherited_from` folders count.
/// More than one grant for the same resource and user should never exist;
/// if it does the most permissive one wins and the inconsistency is logged.
pub fn resolve(
    principal: &Principal,
    resource: &ResourceAccess,
    grants: &[Collaborator],
    now: DateTime<Utc>,
) -> AccessLevel {
    let Some(user_id) = principal.user_id() else {
        return if resource.is_public {
            AccessLevel::Public
        } else {
            AccessLevel::None
        };
    };
    if user_id == resource.owner_id {
        return AccessLevel::Owner;
    }

    let mut per_scope: HashMap<(Option<Uuid>, Option<Uuid>), usize> = HashMap::new();
    let mut best: Option<CollaboratorRole> = None;
    for grant in grants
        .iter()
        .filter(|g| g.user_id == user_id && resource.covers(g))
    {
        let seen = per_scope.entry((grant.file_id, grant.folder_id)).or_default();
        *seen += 1;
        if *seen == 2 {
            error!(
                user_id = %user_id,
                file_id = ?grant.file_id,
                folder_id = ?grant.folder_id,
                "Duplicate collaborator grants for one resource and user"
            );
        }
        if grant.is_expired(now) {
            continue;
        }
        best = best.max(Some(grant.role));
    }

    match best {
        Some(role) => AccessLevel::Granted(role),
        None if resource.is_public => AccessLevel::Public,
        None => AccessLevel::None,
    }
}

/// Whether `principal` may perform an action needing `required`.
pub fn can_access(
    principal: &Principal,
    resource: &ResourceAccess,
    grants: &[Collaborator],
    required: CollaboratorRole,
    now: DateTime<Utc>,
) -> bool {
    resolve(principal, resource, grants, now).satisfies(required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn grant(user_id: Uuid, resource: ResourceRef, role: CollaboratorRole) -> Collaborator {
        let now = Utc::now();
        Collaborator {
            id: Uuid::new_v4(),
            user_id,
            file_id: resource.file_id(),
            folder_id: resource.folder_id(),
            role,
            expires_at: None,
            granted_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_owner_passes_everything() {
        let owner = Uuid::new_v4();
        let file = ResourceAccess::new(ResourceRef::File(Uuid::new_v4()), owner);
        assert!(can_access(
            &Principal::user(owner),
            &file,
            &[],
            CollaboratorRole::Editor,
            Utc::now()
        ));
    }

    #[test]
    fn test_role_ordering() {
        let user = Uuid::new_v4();
        let file = ResourceAccess::new(ResourceRef::File(Uuid::new_v4()), Uuid::new_v4());
        let grants = [grant(user, file.resource, CollaboratorRole::Commenter)];
        let p = Principal::user(user);
        let now = Utc::now();
        assert!(can_access(&p, &file, &grants, CollaboratorRole::Viewer, now));
        assert!(can_access(&p, &file, &grants, CollaboratorRole::Commenter, now));
        assert!(!can_access(&p, &file, &grants, CollaboratorRole::Editor, now));
    }

    #[test]
    fn test_expired_grant_is_inert() {
        let user = Uuid::new_v4();
        let file = ResourceAccess::new(ResourceRef::File(Uuid::new_v4()), Uuid::new_v4());
        let mut g = grant(user, file.resource, CollaboratorRole::Editor);
        g.expires_at = Some(Utc::now() - Duration::seconds(1));
        assert_eq!(
            resolve(&Principal::user(user), &file, &[g], Utc::now()),
            AccessLevel::None
        );
    }

    #[test]
    fn test_anonymous_only_views_public() {
        let file = ResourceAccess::new(ResourceRef::File(Uuid::new_v4()), Uuid::new_v4());
        let now = Utc::now();
        assert!(!can_access(&Principal::Anonymous, &file, &[], CollaboratorRole::Viewer, now));
        let file = file.public(true);
        assert!(can_access(&Principal::Anonymous, &file, &[], CollaboratorRole::Viewer, now));
        assert!(!can_access(&Principal::Anonymous, &file, &[], CollaboratorRole::Commenter, now));
    }

    #[test]
    fn test_folder_grant_inherits_to_nested_file() {
        let user = Uuid::new_v4();
        let top = Uuid::new_v4();
        let file = ResourceAccess::new(ResourceRef::File(Uuid::new_v4()), Uuid::new_v4())
            .inheriting([Uuid::new_v4(), top]);
        let grants = [grant(user, ResourceRef::Folder(top), CollaboratorRole::Editor)];
        assert_eq!(
            resolve(&Principal::user(user), &file, &grants, Utc::now()),
            AccessLevel::Granted(CollaboratorRole::Editor)
        );
    }

    #[test]
    fn test_duplicate_grants_resolve_to_most_permissive() {
        let user = Uuid::new_v4();
        let file = ResourceAccess::new(ResourceRef::File(Uuid::new_v4()), Uuid::new_v4());
        let grants = [
            grant(user, file.resource, CollaboratorRole::Viewer),
            grant(user, file.resource, CollaboratorRole::Editor),
        ];
        assert_eq!(
            resolve(&Principal::user(user), &file, &grants, Utc::now()),
            AccessLevel::Granted(CollaboratorRole::Editor)
        );
    }

    #[test]
    fn test_grants_of_other_users_ignored() {
        let file = ResourceAccess::new(ResourceRef::File(Uuid::new_v4()), Uuid::new_v4());
        let grants = [grant(Uuid::new_v4(), file.resource, CollaboratorRole::Editor)];
        assert_eq!(
            resolve(&Principal::user(Uuid::new_v4()), &file, &grants, Utc::now()),
            AccessLevel::None
        );
    }
}
