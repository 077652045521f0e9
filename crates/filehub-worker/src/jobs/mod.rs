//! Built-in job handlers.

pub mod cleanup;

pub use cleanup::{CollaboratorSweepHandler, TrashSweepHandler};
