//! Request context carrying the caller's identity and deadline.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

use filehub_auth::acl::Principal;
use filehub_core::error::AppError;

/// Context for the current request.
///
/// Built by whatever fronts the core (HTTP layer, CLI, job) after it has
/// authenticated the caller, and passed into every service method.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Who is acting.
    pub principal: Principal,
    /// IP address of the request origin.
    pub ip_address: Option<String>,
    /// User-Agent header value.
    pub user_agent: Option<String>,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
    /// Point after which storage calls give up.
    pub deadline: Option<Instant>,
}

impl RequestContext {
    /// Context for an authenticated user.
    pub fn user(user_id: Uuid) -> Self {
        Self::for_principal(Principal::user(user_id))
    }

    /// Context for an unauthenticated caller (share link access).
    pub fn anonymous() -> Self {
        Self::for_principal(Principal::Anonymous)
    }

    fn for_principal(principal: Principal) -> Self {
        Self {
            principal,
            ip_address: None,
            user_agent: None,
            request_time: Utc::now(),
            deadline: None,
        }
    }

    /// Attach the origin address.
    pub fn with_ip(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    /// Attach the User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Bound storage work to `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// The caller's account ID, if authenticated.
    pub fn user_id(&self) -> Option<Uuid> {
        self.principal.user_id()
    }

    /// The caller's account ID, or `Forbidden` for anonymous callers.
    pub fn require_user(&self) -> Result<Uuid, AppError> {
        self.user_id()
            .ok_or_else(|| AppError::forbidden("This operation requires an authenticated user"))
    }
}
