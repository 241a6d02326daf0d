//! In-memory TTL cache for serialized query results.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::error::Result;
use crate::traits::ResultCache;

#[derive(Debug, Clone)]
struct CacheSlot {
    value: String,
    expires_at: Instant,
}

/// Thread-safe in-memory cache with per-entry expiry.
///
/// Expired slots are dropped lazily on read; long-idle keys linger until
/// read again or swept with [`MemoryResultCache::purge_expired`].
#[derive(Debug, Clone, Default)]
pub struct MemoryResultCache {
    slots: Arc<RwLock<HashMap<String, CacheSlot>>>,
}

impl MemoryResultCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of slots held, including expired ones not yet
    /// dropped.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Returns true if the cache holds no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every expired slot.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.slots.write().retain(|_, slot| slot.expires_at > now);
    }
}

impl ResultCache for MemoryResultCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        {
            let slots = self.slots.read();
            match slots.get(key) {
                Some(slot) if slot.expires_at > now => return Ok(Some(slot.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // The slot exists but has expired.
        self.slots.write().remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let slot = CacheSlot {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.slots.write().insert(key.to_string(), slot);
        Ok(())
    }
}
