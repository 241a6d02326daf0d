//! # sawmill-engine
//!
//! Multi-tenant log processing engine: buffered ingestion, cached queries,
//! alert evaluation, and retention cleanup over pluggable storage.
//!
//! The engine is assembled from four cooperating pieces, each usable on its
//! own:
//!
//! - [`IngestBuffer`]: write-behind batching with high-water and timer
//!   driven flushes
//! - [`CachedQueries`]: query path fronted by a best-effort result cache
//! - [`AlertEvaluator`]: per-entry rule matching with per-rule cooldowns
//! - [`RetentionCleaner`]: periodic deletion of entries past their tenant's
//!   retention window
//!
//! [`LogEngine`] wires them together behind one cloneable handle and owns
//! their background tasks.
//!
//! ## Example
//!
//! ```
//! use sawmill_engine::{EngineConfig, MemoryLogEngine};
//! use sawmill_model::{LogEntry, LogFilter, LogLevel, TenantId};
//!
//! # async fn example() -> sawmill_engine::Result<()> {
//! let engine = MemoryLogEngine::in_memory(EngineConfig::default());
//! let tenant = TenantId::new();
//!
//! let entry = LogEntry::builder()
//!     .tenant_id(tenant)
//!     .service_name("api-gateway")
//!     .level(LogLevel::Error)
//!     .message("upstream timeout")
//!     .build()
//!     .expect("valid entry");
//! engine.ingest_one(entry).await?;
//!
//! let page = engine.query(&LogFilter::new().with_tenant(tenant)).await?;
//! assert_eq!(page.total_count, 1);
//! engine.close().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alerts;
pub mod buffer;
pub mod cache;
pub mod cleaner;
pub mod config;
pub mod engine;
pub mod error;
pub mod tail;
pub mod testing;

pub use alerts::{AlertEvaluator, Notifier, TracingNotifier};
pub use buffer::IngestBuffer;
pub use cache::{CACHE_KEY_PREFIX, CachedQueries, cache_key};
pub use cleaner::{CleanupSummary, RetentionCleaner};
pub use config::{BufferConfig, CacheConfig, CleanerConfig, EngineConfig, EvaluatorConfig};
pub use engine::{LogEngine, MemoryLogEngine};
pub use error::{EngineError, Result};
pub use tail::LogTail;
