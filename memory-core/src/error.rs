//! Error taxonomy shared across the memory worker workspace.
//!
//! Variants map roughly one-to-one onto the HTTP status taxonomy in the
//! system design: `Validation` -> 400, `Auth` -> 401, `NotFound` -> 404,
//! `Conflict` -> 409, `Throttled` -> 429, `Transient` -> 503, everything
//! else -> 500. `memory-worker`'s HTTP layer owns the actual mapping so that
//! this crate stays free of any HTTP dependency.

/// Result type alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the memory worker system.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflicting state: {0}")]
    Conflict(String),

    #[error("rate limit exceeded")]
    Throttled,

    #[error("transient storage error: {0}")]
    Transient(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("embedding provider error: {0}")]
    Embedding(String),

    #[error("summary provider error: {0}")]
    Summary(String),

    #[error("plugin error: {0}")]
    Plugin(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a caller may usefully retry this operation after a backoff.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Transient(_) | Error::Storage(_) | Error::Io(_))
    }

    /// Strip any detail a client should never see, leaving only a stable,
    /// sanitized message. Used by the HTTP layer for the 500 path so that
    /// raw database/provider error text never reaches a response body.
    #[must_use]
    pub fn sanitized_message(&self) -> String {
        match self {
            Error::Validation(msg) | Error::Conflict(msg) => msg.clone(),
            Error::Auth(_) => "authentication required".to_string(),
            Error::NotFound(_) => "not found".to_string(),
            Error::Throttled => "rate limit exceeded".to_string(),
            _ => "internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_recoverable() {
        assert!(Error::Transient("busy".into()).is_recoverable());
        assert!(!Error::Validation("bad".into()).is_recoverable());
    }

    #[test]
    fn internal_errors_sanitize_to_a_stable_message() {
        let err = Error::Internal("sqlite: disk image is malformed at row 42".into());
        assert_eq!(err.sanitized_message(), "internal server error");
    }
}
