//! Domain events emitted by FileHub operations.
//!
//! Events are structured audit records (action, resource, outcome). The
//! core does not persist them; [`DomainEvent::emit`] hands them to
//! `tracing` under the `audit` target and the deployment decides where
//! that target is shipped.

pub mod file;
pub mod share;
pub mod trash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use file::FileEvent;
pub use share::ShareEvent;
pub use trash::TrashEvent;

/// How the audited operation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum EventOutcome {
    /// The operation completed.
    Success,
    /// The operation was refused (authorization, share denial, ...).
    Denied(String),
    /// The operation failed after it was allowed.
    Failed(String),
}

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The user who caused the event (None for anonymous share access).
    pub actor_id: Option<Uuid>,
    /// The event payload.
    pub payload: EventPayload,
    /// Result of the operation.
    pub outcome: EventOutcome,
}

/// Union of all domain event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// A file or folder event.
    File(FileEvent),
    /// A share link or collaborator event.
    Share(ShareEvent),
    /// A trash lifecycle event.
    Trash(TrashEvent),
}

impl DomainEvent {
    /// Create a successful domain event.
    pub fn new(actor_id: Option<Uuid>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_id,
            payload,
            outcome: EventOutcome::Success,
        }
    }

    /// Replace the outcome.
    pub fn with_outcome(mut self, outcome: EventOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Name of the action, e.g. `"share.downloaded"`.
    pub fn action(&self) -> &'static str {
        match &self.payload {
            EventPayload::File(e) => e.action(),
            EventPayload::Share(e) => e.action(),
            EventPayload::Trash(e) => e.action(),
        }
    }

    /// Emit the event on the `audit` tracing target.
    pub fn emit(&self) {
        let payload = serde_json::to_string(&self.payload).unwrap_or_default();
        match &self.outcome {
            EventOutcome::Success => tracing::info!(
                target: "audit",
                event_id = %self.id,
                actor_id = ?self.actor_id,
                action = self.action(),
                outcome = "success",
                payload = %payload,
            ),
            EventOutcome::Denied(reason) => tracing::warn!(
                target: "audit",
                event_id = %self.id,
                actor_id = ?self.actor_id,
                action = self.action(),
                outcome = "denied",
                reason = %reason,
                payload = %payload,
            ),
            EventOutcome::Failed(reason) => tracing::error!(
                target: "audit",
                event_id = %self.id,
                actor_id = ?self.actor_id,
                action = self.action(),
                outcome = "failed",
                reason = %reason,
                payload = %payload,
            ),
        }
    }
}
