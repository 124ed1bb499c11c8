// Error types for the event layer
//
// Three layers of errors:
// - StoreError: event store failures (surfaced by publisher and consumer)
// - HandlerError: derived-state failures inside a consumer handler
// - ServiceError: request-facing errors (validation vs upstream) used by router and adapters

use thiserror::Error;

/// Result type alias for request-facing operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors returned by an event store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store cannot be reached
    #[error("event store unavailable: {0}")]
    Unavailable(String),

    /// Event rejected before reaching the store (empty stream id, etc.)
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Another writer took the version this append was assigned
    #[error("version conflict on stream {stream_id} at version {version}")]
    VersionConflict { stream_id: String, version: i64 },

    /// Payload could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Any other database failure
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Create an unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        StoreError::Unavailable(msg.into())
    }

    /// Create an invalid event error
    pub fn invalid(msg: impl Into<String>) -> Self {
        StoreError::InvalidEvent(msg.into())
    }

    /// Whether a publisher may retry the same append
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::VersionConflict { .. }
        )
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Errors raised by a consumer handler while deriving local state
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The event payload does not have the shape this handler needs.
    /// The consumer logs it, skips the event and keeps going.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// A collaborator (store, provider) failed; the event is retried next round
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl HandlerError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        HandlerError::Malformed(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        HandlerError::Upstream(msg.into())
    }
}

impl From<StoreError> for HandlerError {
    fn from(err: StoreError) -> Self {
        HandlerError::Upstream(err.to_string())
    }
}

/// Request-facing errors
///
/// Validation errors map to 4xx, upstream/store errors to 5xx.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Bad request shape or rejected content
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown resource
    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or invalid credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// AI provider or other upstream service failed
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Event store unreachable
    #[error("event store unavailable: {0}")]
    StoreUnavailable(String),

    /// Missing or invalid configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        ServiceError::Upstream(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ServiceError::NotFound(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ServiceError::Configuration(msg.into())
    }

    /// True for errors caused by the caller (4xx)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::Validation(_) | ServiceError::NotFound(_) | ServiceError::Unauthorized(_)
        )
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidEvent(msg) => ServiceError::Validation(msg),
            StoreError::Unavailable(msg) => ServiceError::StoreUnavailable(msg),
            other => ServiceError::StoreUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_store_errors() {
        assert!(StoreError::unavailable("down").is_transient());
        assert!(StoreError::VersionConflict {
            stream_id: "s".into(),
            version: 2
        }
        .is_transient());
        assert!(!StoreError::invalid("empty").is_transient());
        assert!(!StoreError::Database("boom".into()).is_transient());
    }

    #[test]
    fn test_store_error_to_service_error() {
        let err: ServiceError = StoreError::invalid("empty stream id").into();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(err.is_client_error());

        let err: ServiceError = StoreError::unavailable("timeout").into();
        assert!(matches!(err, ServiceError::StoreUnavailable(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_store_error_to_handler_error() {
        let err: HandlerError = StoreError::unavailable("down").into();
        assert!(matches!(err, HandlerError::Upstream(_)));
    }
}
