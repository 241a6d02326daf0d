//! # sawmill-model
//!
//! Core domain types for the Sawmill log processing engine.
//!
//! This crate provides:
//!
//! - [`LogEntry`]: structured log entries with tenant, correlation, and
//!   provenance fields
//! - [`LogLevel`]: totally ordered severity levels (debug through fatal)
//! - [`LogFilter`]: conjunctive query predicates with pagination
//! - [`TimeRange`]: half-open time intervals for filtering
//! - [`LogQueryResult`], [`LogStats`], [`AggregateBucket`]: query outputs
//! - [`RetentionPolicy`]: per-tenant retention windows
//! - [`AlertRule`]: match predicates with trigger state
//! - [`TenantId`]: tenant identity shared by all of the above
//!
//! ## Example
//!
//! ```rust
//! use sawmill_model::{LogEntry, LogFilter, LogLevel, TenantId};
//!
//! let tenant = TenantId::new();
//!
//! // Build an entry; id and timestamp are assigned at ingestion.
//! let entry = LogEntry::builder()
//!     .tenant_id(tenant)
//!     .service_name("checkout")
//!     .level(LogLevel::Error)
//!     .message("payment declined")
//!     .build();
//! assert!(entry.is_ok());
//!
//! // Build a filter for querying.
//! let filter = LogFilter::new()
//!     .with_tenant(tenant)
//!     .with_min_level(LogLevel::Warn)
//!     .with_contains("payment");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alert;
pub mod entry;
pub mod error;
pub mod filter;
pub mod query;
pub mod retention;
pub mod tenant;


// Re-export main types
pub use alert::{AlertRule, AlertRuleBuilder, AlertSeverity};
pub use entry::{LogEntry, LogEntryBuilder, LogLevel};
pub use error::{ModelError, Result};
pub use filter::{LogFilter, TimeRange};
pub use query::{AggregateBucket, AggregateInterval, LogQueryResult, LogStats};
pub use retention::{RetentionPolicy, DEFAULT_MAX_SIZE_GB, DEFAULT_RETENTION_DAYS};
pub use tenant::TenantId;
