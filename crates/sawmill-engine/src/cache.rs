//! Read-through query caching.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use sawmill_model::{LogFilter, LogQueryResult};
use sawmill_store::{EntryStore, ResultCache};
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::Result;

/// Prefix shared by every cache key written by the query layer.
pub const CACHE_KEY_PREFIX: &str = "log_query:";

/// Builds the cache key for a filter.
///
/// The key is the hex encoding of the filter's JSON serialization, so two
/// filters share a key exactly when they serialize to the same bytes.
/// Pagination fields take part in the key.
///
/// # Errors
///
/// Returns an error if the filter cannot be serialized.
pub fn cache_key(filter: &LogFilter) -> Result<String> {
    let bytes = serde_json::to_vec(filter)?;
    let mut key = String::with_capacity(CACHE_KEY_PREFIX.len() + bytes.len() * 2);
    key.push_str(CACHE_KEY_PREFIX);
    for byte in bytes {
        let _ = write!(key, "{byte:02x}");
    }
    Ok(key)
}

/// Read-through cache in front of the entry store's query path.
///
/// Every cache failure, corrupt payloads included, degrades to a direct
/// store query. Callers cannot observe whether the cache participated.
#[derive(Debug)]
pub struct CachedQueries<S, C> {
    store: Arc<S>,
    cache: Arc<C>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S: EntryStore, C: ResultCache> CachedQueries<S, C> {
    /// Creates the cache layer over a store and cache backend.
    pub fn new(store: Arc<S>, cache: Arc<C>, config: CacheConfig) -> Self {
        Self {
            store,
            cache,
            ttl: config.ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Number of queries served from the cache.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of queries that went to the store.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Runs a query, serving it from the cache when a fresh result exists.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store query itself fails.
    pub async fn query(&self, filter: &LogFilter) -> Result<LogQueryResult> {
        let key = match cache_key(filter) {
            Ok(key) => Some(key),
            Err(err) => {
                debug!(error = %err, "failed to build cache key");
                None
            }
        };

        if let Some(ref key) = key {
            match self.cache.get(key).await {
                Ok(Some(payload)) => match serde_json::from_str::<LogQueryResult>(&payload) {
                    Ok(result) => {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        return Ok(result);
                    }
                    Err(err) => {
                        debug!(error = %err, "corrupt cached result, falling through");
                    }
                },
                Ok(None) => {}
                Err(err) => {
                    debug!(error = %err, "cache read failed, falling through");
                }
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let result = self.store.query(filter).await?;

        if let Some(ref key) = key {
            match serde_json::to_string(&result) {
                Ok(payload) => {
                    if let Err(err) = self.cache.set(key, &payload, self.ttl).await {
                        debug!(error = %err, "cache write failed");
                    }
                }
                Err(err) => {
                    debug!(error = %err, "failed to serialize result for caching");
                }
            }
        }
        Ok(result)
    }
}
