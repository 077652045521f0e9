//! Access control for files and folders.

pub mod resolver;

pub use resolver::{AccessLevel, Principal, ResourceAccess, can_access, resolve};
