//! Collaboration grant entities.

pub mod model;
pub mod role;

pub use model::{Collaborator, ResourceRef, ResourceType, UpsertCollaborator};
pub use role::CollaboratorRole;
