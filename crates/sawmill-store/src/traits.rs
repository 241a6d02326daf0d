//! Storage trait definitions.
//!
//! Every backend used by the engine is reached through one of the traits in
//! this module. The in-memory implementations in [`crate::memory`] serve as
//! the reference backends; production deployments substitute their own.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sawmill_model::{
    AggregateBucket, AggregateInterval, AlertRule, LogEntry, LogFilter, LogQueryResult, LogStats,
    RetentionPolicy, TenantId, TimeRange,
};
use uuid::Uuid;

use crate::error::Result;

/// Durable storage for log entries.
///
/// Implementations must be cheap to clone or wrapped in shared ownership so
/// the engine can hand them to background tasks.
#[allow(async_fn_in_trait)]
pub trait EntryStore: Send + Sync + 'static {
    /// Persists a single entry. The entry id must already be assigned and
    /// unique.
    fn create(&self, entry: &LogEntry) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Persists a batch of entries in one operation.
    fn create_batch(
        &self,
        entries: &[LogEntry],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Looks up a single entry by id.
    fn find_by_id(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<Option<LogEntry>>> + Send;

    /// Runs a filtered, paginated query. Results are ordered newest first.
    fn query(
        &self,
        filter: &LogFilter,
    ) -> impl std::future::Future<Output = Result<LogQueryResult>> + Send;

    /// Returns all entries sharing a trace id, oldest first.
    fn find_by_trace_id(
        &self,
        trace_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<LogEntry>>> + Send;

    /// Returns all entries sharing a request id, oldest first.
    fn find_by_request_id(
        &self,
        request_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<LogEntry>>> + Send;

    /// Computes counts and time bounds over the selected entries.
    fn stats(
        &self,
        tenant_id: Option<TenantId>,
        range: Option<TimeRange>,
    ) -> impl std::future::Future<Output = Result<LogStats>> + Send;

    /// Buckets matching entries by time interval, ascending by bucket start.
    fn aggregate(
        &self,
        filter: &LogFilter,
        interval: AggregateInterval,
    ) -> impl std::future::Future<Output = Result<Vec<AggregateBucket>>> + Send;

    /// Lists distinct service names, sorted ascending.
    fn list_services(
        &self,
        tenant_id: Option<TenantId>,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Estimates the stored size of the selected entries in bytes.
    fn estimate_storage_bytes(
        &self,
        tenant_id: Option<TenantId>,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;

    /// Deletes entries strictly older than the cutoff. Entries stamped
    /// exactly at the cutoff are retained. Returns the number removed.
    fn delete_older_than(
        &self,
        tenant_id: Option<TenantId>,
        cutoff: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;
}

/// Short-lived cache for serialized query results.
///
/// The engine treats this as strictly best-effort. Errors from either
/// operation degrade to a cache miss and never surface to callers.
#[allow(async_fn_in_trait)]
pub trait ResultCache: Send + Sync + 'static {
    /// Fetches a cached value, or `None` when absent or expired.
    fn get(&self, key: &str) -> impl std::future::Future<Output = Result<Option<String>>> + Send;

    /// Stores a value under the key for at most `ttl`.
    fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// A cache that stores nothing, for testing or disabled caching.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Creates a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ResultCache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<()> {
        Ok(())
    }
}

/// Storage for alert rule definitions.
#[allow(async_fn_in_trait)]
pub trait AlertRuleStore: Send + Sync + 'static {
    /// Persists a new rule. Fails if the id is already taken.
    fn create(&self, rule: &AlertRule) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Replaces an existing rule.
    fn update(&self, rule: &AlertRule) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Looks up a rule by id.
    fn get(&self, id: Uuid)
    -> impl std::future::Future<Output = Result<Option<AlertRule>>> + Send;

    /// Lists rules, optionally restricted to one tenant. Ordered by name.
    fn list(
        &self,
        tenant_id: Option<TenantId>,
    ) -> impl std::future::Future<Output = Result<Vec<AlertRule>>> + Send;

    /// Lists every enabled rule across all tenants.
    fn list_enabled(&self) -> impl std::future::Future<Output = Result<Vec<AlertRule>>> + Send;

    /// Flips the enabled flag on a rule.
    fn set_enabled(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Records the instant a rule last fired.
    fn update_last_triggered(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Removes a rule.
    fn delete(&self, id: Uuid) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Storage for per-tenant retention policies. At most one policy exists per
/// tenant.
#[allow(async_fn_in_trait)]
pub trait RetentionPolicyStore: Send + Sync + 'static {
    /// Creates or replaces the policy for the policy's tenant.
    fn upsert(
        &self,
        policy: &RetentionPolicy,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Looks up the policy for a tenant.
    fn get(
        &self,
        tenant_id: TenantId,
    ) -> impl std::future::Future<Output = Result<Option<RetentionPolicy>>> + Send;

    /// Lists every stored policy.
    fn list_all(&self) -> impl std::future::Future<Output = Result<Vec<RetentionPolicy>>> + Send;

    /// Removes the policy for a tenant.
    fn delete(&self, tenant_id: TenantId) -> impl std::future::Future<Output = Result<()>> + Send;
}
