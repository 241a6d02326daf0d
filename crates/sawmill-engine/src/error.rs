//! Error types for the engine.

use std::time::Duration;

use sawmill_model::ModelError;
use sawmill_store::StoreError;
use thiserror::Error;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A payload failed validation.
    #[error("invalid payload: {0}")]
    Model(#[from] ModelError),

    /// A storage backend operation failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A buffer flush did not complete within the write timeout.
    #[error("flush timed out after {0:?}")]
    FlushTimeout(Duration),

    /// The engine has been closed and rejects new operations.
    #[error("engine is closed")]
    Closed,
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
