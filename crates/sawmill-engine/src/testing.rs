//! Test doubles for the engine's storage and notification seams.
//!
//! These wrap the in-memory backends with call counters and switchable
//! failure modes so tests can observe how the engine drives its stores.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sawmill_model::{
    AggregateBucket, AggregateInterval, AlertRule, LogEntry, LogFilter, LogQueryResult, LogStats,
    RetentionPolicy, TenantId, TimeRange,
};
use sawmill_store::{
    AlertRuleStore, EntryStore, MemoryAlertRuleStore, MemoryEntryStore,
    MemoryRetentionPolicyStore, ResultCache, Result as StoreResult, RetentionPolicyStore,
    StoreError,
};
use uuid::Uuid;

use crate::alerts::Notifier;
use crate::error::Result;

/// An entry store that counts calls and can be told to fail or stall.
#[derive(Debug, Clone, Default)]
pub struct CountingEntryStore {
    inner: MemoryEntryStore,
    state: Arc<CountingState>,
}

#[derive(Debug, Default)]
struct CountingState {
    create_calls: AtomicUsize,
    batch_calls: AtomicUsize,
    query_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_writes: AtomicBool,
    write_delay: Mutex<Option<Duration>>,
    fail_delete_for: Mutex<Option<TenantId>>,
}

impl CountingEntryStore {
    /// Creates an empty counting store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create` calls observed.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.state.create_calls.load(Ordering::Relaxed)
    }

    /// Number of `create_batch` calls observed.
    #[must_use]
    pub fn batch_calls(&self) -> usize {
        self.state.batch_calls.load(Ordering::Relaxed)
    }

    /// Number of `query` calls observed.
    #[must_use]
    pub fn query_calls(&self) -> usize {
        self.state.query_calls.load(Ordering::Relaxed)
    }

    /// Number of `delete_older_than` calls observed.
    #[must_use]
    pub fn delete_calls(&self) -> usize {
        self.state.delete_calls.load(Ordering::Relaxed)
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn stored_len(&self) -> usize {
        self.inner.len()
    }

    /// Makes every write fail until disabled.
    pub fn fail_writes(&self, fail: bool) {
        self.state.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Stalls every write by the given delay.
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *self.state.write_delay.lock() = delay;
    }

    /// Makes `delete_older_than` fail for one tenant.
    pub fn fail_delete_for(&self, tenant_id: Option<TenantId>) {
        *self.state.fail_delete_for.lock() = tenant_id;
    }

    /// Loads entries directly, bypassing counters and failure modes.
    ///
    /// Entries must carry unique ids.
    pub async fn seed(&self, entries: &[LogEntry]) {
        let result = self.inner.create_batch(entries).await;
        assert!(result.is_ok(), "seed entries must be valid and unique");
    }

    async fn before_write(&self) -> StoreResult<()> {
        let delay = *self.state.write_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.state.fail_writes.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

impl EntryStore for CountingEntryStore {
    async fn create(&self, entry: &LogEntry) -> StoreResult<()> {
        self.state.create_calls.fetch_add(1, Ordering::Relaxed);
        self.before_write().await?;
        self.inner.create(entry).await
    }

    async fn create_batch(&self, entries: &[LogEntry]) -> StoreResult<()> {
        self.state.batch_calls.fetch_add(1, Ordering::Relaxed);
        self.before_write().await?;
        self.inner.create_batch(entries).await
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<LogEntry>> {
        self.inner.find_by_id(id).await
    }

    async fn query(&self, filter: &LogFilter) -> StoreResult<LogQueryResult> {
        self.state.query_calls.fetch_add(1, Ordering::Relaxed);
        self.inner.query(filter).await
    }

    async fn find_by_trace_id(&self, trace_id: &str) -> StoreResult<Vec<LogEntry>> {
        self.inner.find_by_trace_id(trace_id).await
    }

    async fn find_by_request_id(&self, request_id: &str) -> StoreResult<Vec<LogEntry>> {
        self.inner.find_by_request_id(request_id).await
    }

    async fn stats(
        &self,
        tenant_id: Option<TenantId>,
        range: Option<TimeRange>,
    ) -> StoreResult<LogStats> {
        self.inner.stats(tenant_id, range).await
    }

    async fn aggregate(
        &self,
        filter: &LogFilter,
        interval: AggregateInterval,
    ) -> StoreResult<Vec<AggregateBucket>> {
        self.inner.aggregate(filter, interval).await
    }

    async fn list_services(&self, tenant_id: Option<TenantId>) -> StoreResult<Vec<String>> {
        self.inner.list_services(tenant_id).await
    }

    async fn estimate_storage_bytes(&self, tenant_id: Option<TenantId>) -> StoreResult<u64> {
        self.inner.estimate_storage_bytes(tenant_id).await
    }

    async fn delete_older_than(
        &self,
        tenant_id: Option<TenantId>,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<u64> {
        self.state.delete_calls.fetch_add(1, Ordering::Relaxed);
        let broken = *self.state.fail_delete_for.lock();
        if tenant_id.is_some() && tenant_id == broken {
            return Err(StoreError::Unavailable("deletes disabled".to_string()));
        }
        self.inner.delete_older_than(tenant_id, cutoff).await
    }
}

/// A cache whose operations always fail.
#[derive(Debug, Clone, Default)]
pub struct FailingCache {
    get_calls: Arc<AtomicUsize>,
    set_calls: Arc<AtomicUsize>,
}

impl FailingCache {
    /// Creates a new failing cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls observed.
    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::Relaxed)
    }

    /// Number of `set` calls observed.
    #[must_use]
    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::Relaxed)
    }
}

impl ResultCache for FailingCache {
    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        Err(StoreError::Unavailable("cache offline".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> StoreResult<()> {
        self.set_calls.fetch_add(1, Ordering::Relaxed);
        Err(StoreError::Unavailable("cache offline".to_string()))
    }
}

/// A notifier that records deliveries instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct CollectingNotifier {
    state: Arc<NotifierState>,
}

#[derive(Debug, Default)]
struct NotifierState {
    delivered: Mutex<Vec<(String, String)>>,
    attempts: AtomicUsize,
    fail: AtomicBool,
}

impl CollectingNotifier {
    /// Creates a new collecting notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful deliveries as (rule name, entry message) pairs.
    #[must_use]
    pub fn delivered(&self) -> Vec<(String, String)> {
        self.state.delivered.lock().clone()
    }

    /// Number of successful deliveries.
    #[must_use]
    pub fn count(&self) -> usize {
        self.state.delivered.lock().len()
    }

    /// Number of delivery attempts, successful or not.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::Relaxed)
    }

    /// Makes every delivery fail until disabled.
    pub fn fail_deliveries(&self, fail: bool) {
        self.state.fail.store(fail, Ordering::Relaxed);
    }
}

impl Notifier for CollectingNotifier {
    async fn notify(&self, rule: &AlertRule, entry: &LogEntry) -> Result<()> {
        self.state.attempts.fetch_add(1, Ordering::Relaxed);
        if self.state.fail.load(Ordering::Relaxed) {
            return Err(crate::error::EngineError::Store(StoreError::Unavailable(
                "delivery disabled".to_string(),
            )));
        }
        self.state
            .delivered
            .lock()
            .push((rule.name.clone(), entry.message.clone()));
        Ok(())
    }
}

/// A rule store whose listing and trigger bookkeeping can be made to fail.
#[derive(Debug, Clone, Default)]
pub struct FlakyRuleStore {
    inner: MemoryAlertRuleStore,
    fail_list: Arc<AtomicBool>,
    fail_touch: Arc<AtomicBool>,
}

impl FlakyRuleStore {
    /// Creates an empty flaky rule store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `list` and `list_enabled` fail until disabled.
    pub fn fail_listing(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::Relaxed);
    }

    /// Makes `update_last_triggered` fail until disabled.
    pub fn fail_touch(&self, fail: bool) {
        self.fail_touch.store(fail, Ordering::Relaxed);
    }

    fn listing_error(&self) -> StoreResult<()> {
        if self.fail_list.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("listing disabled".to_string()));
        }
        Ok(())
    }
}

impl AlertRuleStore for FlakyRuleStore {
    async fn create(&self, rule: &AlertRule) -> StoreResult<()> {
        self.inner.create(rule).await
    }

    async fn update(&self, rule: &AlertRule) -> StoreResult<()> {
        self.inner.update(rule).await
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<AlertRule>> {
        self.inner.get(id).await
    }

    async fn list(&self, tenant_id: Option<TenantId>) -> StoreResult<Vec<AlertRule>> {
        self.listing_error()?;
        self.inner.list(tenant_id).await
    }

    async fn list_enabled(&self) -> StoreResult<Vec<AlertRule>> {
        self.listing_error()?;
        self.inner.list_enabled().await
    }

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> StoreResult<()> {
        self.inner.set_enabled(id, enabled).await
    }

    async fn update_last_triggered(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        if self.fail_touch.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable(
                "trigger bookkeeping disabled".to_string(),
            ));
        }
        self.inner.update_last_triggered(id, at).await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.inner.delete(id).await
    }
}

/// A policy store whose listing can be made to fail.
#[derive(Debug, Clone, Default)]
pub struct FlakyPolicyStore {
    inner: MemoryRetentionPolicyStore,
    fail_list: Arc<AtomicBool>,
}

impl FlakyPolicyStore {
    /// Creates an empty flaky policy store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `list_all` fail until disabled.
    pub fn fail_listing(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::Relaxed);
    }
}

impl RetentionPolicyStore for FlakyPolicyStore {
    async fn upsert(&self, policy: &RetentionPolicy) -> StoreResult<()> {
        self.inner.upsert(policy).await
    }

    async fn get(&self, tenant_id: TenantId) -> StoreResult<Option<RetentionPolicy>> {
        self.inner.get(tenant_id).await
    }

    async fn list_all(&self) -> StoreResult<Vec<RetentionPolicy>> {
        if self.fail_list.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("listing disabled".to_string()));
        }
        self.inner.list_all().await
    }

    async fn delete(&self, tenant_id: TenantId) -> StoreResult<()> {
        self.inner.delete(tenant_id).await
    }
}
