//! Error types for the domain model.

use thiserror::Error;

/// Errors produced when constructing or validating domain values.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A required field was not provided.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A log entry failed validation.
    #[error("invalid log entry: {reason}")]
    InvalidEntry {
        /// Why the entry was rejected.
        reason: String,
    },

    /// An alert rule failed validation.
    #[error("invalid alert rule: {reason}")]
    InvalidRule {
        /// Why the rule was rejected.
        reason: String,
    },

    /// A string could not be parsed as a log level.
    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    /// A string could not be parsed as an aggregation interval.
    #[error("invalid aggregation interval: {0}")]
    InvalidInterval(String),

    /// A string could not be parsed as a tenant identifier.
    #[error("invalid tenant id: {0}")]
    InvalidTenantId(String),
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
