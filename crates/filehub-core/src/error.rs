//! Unified application error types for FileHub.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Storage backends report the more
//! specific [`StorageError`], which converts into `AppError` at the service
//! boundary.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested resource or share token was not found.
    NotFound,
    /// The caller is not allowed to perform the action.
    Forbidden,
    /// Name collision, cyclic move or duplicate record.
    Conflict,
    /// A share link is past its expiry.
    Expired,
    /// A share link has used up its download quota.
    QuotaExhausted,
    /// A share password was missing or wrong.
    InvalidCredential,
    /// Input validation failed.
    Validation,
    /// A storage backend I/O error occurred.
    Storage,
    /// A persisted invariant was found violated.
    Inconsistent,
    /// A database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Forbidden => write!(f, "FORBIDDEN"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::QuotaExhausted => write!(f, "QUOTA_EXHAUSTED"),
            Self::InvalidCredential => write!(f, "INVALID_CREDENTIAL"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Inconsistent => write!(f, "INCONSISTENT"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout FileHub.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create an expired error.
    pub fn expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Expired, message)
    }

    /// Create a quota-exhausted error.
    pub fn quota_exhausted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::QuotaExhausted, message)
    }

    /// Create an invalid-credential error.
    pub fn invalid_credential(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidCredential, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create an inconsistency error.
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Inconsistent, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this error has the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

/// Error reported by an [`ObjectStore`](crate::traits::storage::ObjectStore)
/// backend. Every variant names the backend and the object key involved.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The object does not exist.
    #[error("{backend}: object '{key}' not found")]
    NotFound {
        /// Backend name.
        backend: &'static str,
        /// Object key.
        key: String,
    },
    /// The key is not a safe, namespaced object key.
    #[error("{backend}: invalid object key '{key}'")]
    InvalidKey {
        /// Backend name.
        backend: &'static str,
        /// Object key.
        key: String,
    },
    /// The caller's deadline elapsed before the backend answered.
    #[error("{backend}: {operation} on '{key}' timed out")]
    Timeout {
        /// Backend name.
        backend: &'static str,
        /// Object key.
        key: String,
        /// Operation name.
        operation: &'static str,
    },
    /// Any other backend failure.
    #[error("{backend}: {operation} on '{key}' failed: {source}")]
    Backend {
        /// Backend name.
        backend: &'static str,
        /// Object key.
        key: String,
        /// Operation name.
        operation: &'static str,
        /// Underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StorageError {
    /// Build a backend failure from any error type.
    pub fn backend(
        backend: &'static str,
        key: impl Into<String>,
        operation: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Backend {
            backend,
            key: key.into(),
            operation,
            source: source.into(),
        }
    }

    /// Whether the error is the tolerable "object missing" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// The key of the object involved.
    pub fn key(&self) -> &str {
        match self {
            Self::NotFound { key, .. }
            | Self::InvalidKey { key, .. }
            | Self::Timeout { key, .. }
            | Self::Backend { key, .. } => key,
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let kind = if err.is_not_found() {
            ErrorKind::NotFound
        } else {
            ErrorKind::Storage
        };
        Self::with_source(kind, err.to_string(), err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
