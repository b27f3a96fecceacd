//! Error types for secret lookups.
//!
//! Fetch failures are classified once, at the client boundary, into a
//! [`FetchError`]. The resolver then decides from that classification whether
//! the failure is subject to the caller's missing/denied policy or is fatal.

use thiserror::Error;

/// Outcome of a failed secret version fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The secret or the requested version does not exist.
    #[error("secret version not found")]
    NotFound,

    /// The caller is not allowed to read the secret.
    #[error("permission denied")]
    PermissionDenied,

    /// Transport, quota, malformed response or any other service failure.
    #[error("{0}")]
    Other(String),
}

/// Fatal error returned by a lookup. Aborts the whole batch.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Invalid options, malformed nested term or missing nested key.
    #[error("{0}")]
    Configuration(String),

    #[error("Failed to find secret {term} (ResourceNotFound)")]
    NotFound { term: String },

    #[error("Failed to access secret {term} (AccessDenied)")]
    AccessDenied { term: String },

    /// Any other service error, never subject to policy.
    #[error("Failed to retrieve secret: {0}")]
    Service(String),

    /// The payload could not be decoded as text or, for nested lookups, as JSON.
    #[error("Secret {term} has an unreadable payload: {reason}")]
    InvalidPayload { term: String, reason: String },
}

pub type Result<T> = std::result::Result<T, LookupError>;
