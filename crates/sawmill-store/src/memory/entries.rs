//! In-memory log entry storage.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sawmill_model::{
    AggregateBucket, AggregateInterval, LogEntry, LogFilter, LogQueryResult, LogStats, TenantId,
    TimeRange,
};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::traits::EntryStore;

/// Configuration for the in-memory entry store.
#[derive(Debug, Clone)]
pub struct MemoryEntryStoreConfig {
    /// Maximum number of entries to keep. The oldest inserted entries are
    /// evicted first once the limit is exceeded.
    pub max_entries: usize,
}

impl Default for MemoryEntryStoreConfig {
    fn default() -> Self {
        Self {
            max_entries: 100_000,
        }
    }
}

/// Thread-safe in-memory entry store.
///
/// Cloning is cheap; all clones share the same underlying storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryEntryStore {
    inner: Arc<EntryStoreInner>,
}

#[derive(Debug, Default)]
struct EntryStoreInner {
    config: MemoryEntryStoreConfig,
    /// All entries, ordered by insertion
    entries: RwLock<VecDeque<LogEntry>>,
    /// Fast lookup by entry id
    by_id: RwLock<HashMap<Uuid, LogEntry>>,
}

impl MemoryEntryStore {
    /// Creates a store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with the given configuration.
    #[must_use]
    pub fn with_config(config: MemoryEntryStoreConfig) -> Self {
        Self {
            inner: Arc::new(EntryStoreInner {
                config,
                entries: RwLock::new(VecDeque::new()),
                by_id: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Returns true if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn enforce_capacity(entries: &mut VecDeque<LogEntry>, by_id: &mut HashMap<Uuid, LogEntry>, max: usize) {
        while entries.len() > max {
            if let Some(removed) = entries.pop_front() {
                if let Some(id) = removed.id {
                    by_id.remove(&id);
                }
            }
        }
    }

    fn require_id(entry: &LogEntry) -> Result<Uuid> {
        entry
            .id
            .ok_or_else(|| StoreError::Write("entry has no id assigned".to_string()))
    }
}

impl EntryStore for MemoryEntryStore {
    #[allow(clippy::significant_drop_tightening)]
    async fn create(&self, entry: &LogEntry) -> Result<()> {
        let id = Self::require_id(entry)?;

        let mut entries = self.inner.entries.write();
        let mut by_id = self.inner.by_id.write();

        if by_id.contains_key(&id) {
            return Err(StoreError::Write(format!("duplicate entry id: {id}")));
        }

        entries.push_back(entry.clone());
        by_id.insert(id, entry.clone());
        Self::enforce_capacity(&mut entries, &mut by_id, self.inner.config.max_entries);
        Ok(())
    }

    #[allow(clippy::significant_drop_tightening)]
    async fn create_batch(&self, batch: &[LogEntry]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut entries = self.inner.entries.write();
        let mut by_id = self.inner.by_id.write();

        // Validate the whole batch before inserting anything.
        let mut seen = HashSet::with_capacity(batch.len());
        for entry in batch {
            let id = Self::require_id(entry)?;
            if by_id.contains_key(&id) || !seen.insert(id) {
                return Err(StoreError::Write(format!("duplicate entry id: {id}")));
            }
        }

        for entry in batch {
            if let Some(id) = entry.id {
                by_id.insert(id, entry.clone());
            }
            entries.push_back(entry.clone());
        }
        Self::enforce_capacity(&mut entries, &mut by_id, self.inner.config.max_entries);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LogEntry>> {
        Ok(self.inner.by_id.read().get(&id).cloned())
    }

    async fn query(&self, filter: &LogFilter) -> Result<LogQueryResult> {
        let entries = self.inner.entries.read();

        let mut matching: Vec<&LogEntry> =
            entries.iter().filter(|entry| filter.matches(entry)).collect();
        matching.sort_by_key(|entry| std::cmp::Reverse(entry.recorded_at()));

        let total_count = matching.len() as u64;
        let page = filter.normalized_page();
        let page_size = filter.normalized_page_size();
        let offset = (u64::from(page) - 1) * u64::from(page_size);

        let page_entries: Vec<LogEntry> = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok(LogQueryResult::new(page_entries, total_count, page, page_size))
    }

    async fn find_by_trace_id(&self, trace_id: &str) -> Result<Vec<LogEntry>> {
        let entries = self.inner.entries.read();
        let mut matching: Vec<LogEntry> = entries
            .iter()
            .filter(|entry| entry.trace_id.as_deref() == Some(trace_id))
            .cloned()
            .collect();
        matching.sort_by_key(LogEntry::recorded_at);
        Ok(matching)
    }

    async fn find_by_request_id(&self, request_id: &str) -> Result<Vec<LogEntry>> {
        let entries = self.inner.entries.read();
        let mut matching: Vec<LogEntry> = entries
            .iter()
            .filter(|entry| entry.request_id.as_deref() == Some(request_id))
            .cloned()
            .collect();
        matching.sort_by_key(LogEntry::recorded_at);
        Ok(matching)
    }

    async fn stats(
        &self,
        tenant_id: Option<TenantId>,
        range: Option<TimeRange>,
    ) -> Result<LogStats> {
        let entries = self.inner.entries.read();
        let mut stats = LogStats::default();
        for entry in entries.iter() {
            if tenant_id.is_some_and(|tenant| entry.tenant_id != tenant) {
                continue;
            }
            if range.is_some_and(|r| !r.contains(entry.recorded_at())) {
                continue;
            }
            stats.observe(entry);
        }
        Ok(stats)
    }

    async fn aggregate(
        &self,
        filter: &LogFilter,
        interval: AggregateInterval,
    ) -> Result<Vec<AggregateBucket>> {
        let entries = self.inner.entries.read();
        let mut buckets: BTreeMap<DateTime<Utc>, u64> = BTreeMap::new();
        for entry in entries.iter().filter(|entry| filter.matches(entry)) {
            let bucket_start = interval.truncate(entry.recorded_at());
            *buckets.entry(bucket_start).or_insert(0) += 1;
        }
        Ok(buckets
            .into_iter()
            .map(|(bucket_start, count)| AggregateBucket {
                bucket_start,
                count,
            })
            .collect())
    }

    async fn list_services(&self, tenant_id: Option<TenantId>) -> Result<Vec<String>> {
        let entries = self.inner.entries.read();
        let services: BTreeSet<String> = entries
            .iter()
            .filter(|entry| tenant_id.is_none_or(|tenant| entry.tenant_id == tenant))
            .map(|entry| entry.service_name.clone())
            .collect();
        Ok(services.into_iter().collect())
    }

    async fn estimate_storage_bytes(&self, tenant_id: Option<TenantId>) -> Result<u64> {
        let entries = self.inner.entries.read();
        let mut total: u64 = 0;
        for entry in entries
            .iter()
            .filter(|entry| tenant_id.is_none_or(|tenant| entry.tenant_id == tenant))
        {
            total += serde_json::to_vec(entry)?.len() as u64;
        }
        Ok(total)
    }

    #[allow(clippy::significant_drop_tightening)]
    async fn delete_older_than(
        &self,
        tenant_id: Option<TenantId>,
        cutoff: DateTime<Utc>,
    ) -> Result<u64> {
        let mut entries = self.inner.entries.write();
        let mut by_id = self.inner.by_id.write();

        let before = entries.len();
        entries.retain(|entry| {
            let in_scope = tenant_id.is_none_or(|tenant| entry.tenant_id == tenant);
            let expired = in_scope && entry.recorded_at() < cutoff;
            if expired {
                if let Some(id) = entry.id {
                    by_id.remove(&id);
                }
            }
            !expired
        });
        Ok((before - entries.len()) as u64)
    }
}
