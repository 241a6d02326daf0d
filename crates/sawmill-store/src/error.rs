//! Error types for storage operations.

use thiserror::Error;

/// Errors returned by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A write operation failed.
    #[error("write failed: {0}")]
    Write(String),

    /// A read or query operation failed.
    #[error("query failed: {0}")]
    Query(String),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A record could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store has been closed and no longer accepts operations.
    #[error("store closed")]
    Closed,
}

/// Convenience result alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "store unavailable: connection refused");

        let err = StoreError::Write("disk full".to_string());
        assert_eq!(err.to_string(), "write failed: disk full");

        let err = StoreError::NotFound("rule 42".to_string());
        assert_eq!(err.to_string(), "not found: rule 42");

        let err = StoreError::Closed;
        assert_eq!(err.to_string(), "store closed");
    }

    #[test]
    fn test_serialization_error_from() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = StoreError::from(json_err);
        assert!(matches!(err, StoreError::Serialization(_)));
        assert!(err.to_string().starts_with("serialization error:"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StoreError>();
    }
}
