//! # sawmill-store
//!
//! Storage interfaces and in-memory reference backends for the Sawmill log
//! processing engine.
//!
//! The engine reaches storage exclusively through the traits defined here:
//!
//! - [`EntryStore`]: durable log entry storage and querying
//! - [`ResultCache`]: best-effort expiring cache for serialized query results
//! - [`AlertRuleStore`]: alert rule definitions
//! - [`RetentionPolicyStore`]: per-tenant retention policies
//!
//! The [`memory`] module provides process-local implementations of all four,
//! suitable for tests and single-node deployments.
//!
//! ## Example
//!
//! ```
//! use sawmill_model::{LogEntry, LogFilter, LogLevel, TenantId};
//! use sawmill_store::{EntryStore, MemoryEntryStore};
//!
//! # async fn example() -> sawmill_store::Result<()> {
//! let store = MemoryEntryStore::new();
//! let mut entry = LogEntry::builder()
//!     .tenant_id(TenantId::new())
//!     .service_name("api-gateway")
//!     .level(LogLevel::Error)
//!     .message("upstream timeout")
//!     .timestamp(chrono::Utc::now())
//!     .build()
//!     .expect("valid entry");
//! entry.id = Some(uuid::Uuid::new_v4());
//!
//! store.create(&entry).await?;
//! let page = store.query(&LogFilter::new()).await?;
//! assert_eq!(page.total_count, 1);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{
    MemoryAlertRuleStore, MemoryEntryStore, MemoryEntryStoreConfig, MemoryResultCache,
    MemoryRetentionPolicyStore,
};
pub use traits::{AlertRuleStore, EntryStore, NoopCache, ResultCache, RetentionPolicyStore};
