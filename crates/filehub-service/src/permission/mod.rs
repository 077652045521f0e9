//! Permission checks and collaborator grant management.

pub mod collaborator;
pub mod service;

pub use collaborator::{AddCollaboratorRequest, CollaboratorService, UpdateCollaboratorRequest};
pub use service::PermissionService;
