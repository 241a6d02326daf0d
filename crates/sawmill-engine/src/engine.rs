//! The engine facade tying ingestion, caching, alerting, and retention
//! together behind one handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use sawmill_model::{
    AggregateBucket, AggregateInterval, AlertRule, LogEntry, LogFilter, LogLevel, LogQueryResult,
    LogStats, RetentionPolicy, TenantId, TimeRange,
};
use sawmill_store::{
    AlertRuleStore, EntryStore, MemoryAlertRuleStore, MemoryEntryStore, MemoryResultCache,
    MemoryRetentionPolicyStore, ResultCache, RetentionPolicyStore,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alerts::{AlertEvaluator, Notifier, TracingNotifier};
use crate::buffer::IngestBuffer;
use crate::cache::CachedQueries;
use crate::cleaner::{CleanupSummary, RetentionCleaner};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::tail::{LogTail, spawn_tail_task};

/// Multi-tenant log processing engine.
///
/// One engine owns an ingestion buffer, a cached query layer, an alert
/// evaluation worker, and a retention cleaner, all backed by the stores it
/// was constructed over. Handles are cheap to clone and share all state.
/// Ingestion and queries are rejected after [`close`](Self::close).
pub struct LogEngine<S, C, R, P, N> {
    inner: Arc<EngineInner<S, C, R, P, N>>,
}

/// Engine wired to fresh in-memory backends and the tracing notifier.
pub type MemoryLogEngine = LogEngine<
    MemoryEntryStore,
    MemoryResultCache,
    MemoryAlertRuleStore,
    MemoryRetentionPolicyStore,
    TracingNotifier,
>;

struct EngineInner<S, C, R, P, N> {
    /// Durable entry storage.
    store: Arc<S>,
    /// Cache-fronted query path.
    queries: Arc<CachedQueries<S, C>>,
    /// Deferred-write ingestion buffer.
    buffer: Arc<IngestBuffer<S>>,
    /// Alert rule evaluation.
    evaluator: Arc<AlertEvaluator<R, N>>,
    /// Retention enforcement.
    cleaner: Arc<RetentionCleaner<S, P>>,
    /// Alert rule definitions.
    rules: Arc<R>,
    /// Per-tenant retention policies.
    policies: Arc<P>,
    /// Engine configuration as constructed.
    config: EngineConfig,
    /// Queue feeding the evaluation worker.
    eval_tx: mpsc::Sender<LogEntry>,
    /// Shutdown signal for background tasks.
    shutdown_tx: broadcast::Sender<()>,
    /// Set once by `close`.
    closed: AtomicBool,
    /// Background task handles, drained on close.
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<S, C, R, P, N> Clone for LogEngine<S, C, R, P, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, C, R, P, N> std::fmt::Debug for LogEngine<S, C, R, P, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogEngine")
            .field("closed", &self.inner.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl MemoryLogEngine {
    /// Creates an engine over fresh in-memory backends.
    #[must_use]
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(
            MemoryEntryStore::new(),
            MemoryResultCache::new(),
            MemoryAlertRuleStore::new(),
            MemoryRetentionPolicyStore::new(),
            TracingNotifier::new(),
            config,
        )
    }
}

impl<S, C, R, P, N> LogEngine<S, C, R, P, N>
where
    S: EntryStore,
    C: ResultCache,
    R: AlertRuleStore,
    P: RetentionPolicyStore,
    N: Notifier,
{
    /// Creates an engine over the given backends and starts its background
    /// tasks on the current tokio runtime.
    #[must_use]
    pub fn new(store: S, cache: C, rules: R, policies: P, notifier: N, config: EngineConfig) -> Self {
        let store = Arc::new(store);
        let rules = Arc::new(rules);
        let policies = Arc::new(policies);

        let queries = Arc::new(CachedQueries::new(
            Arc::clone(&store),
            Arc::new(cache),
            config.cache.clone(),
        ));
        let buffer = Arc::new(IngestBuffer::new(Arc::clone(&store), config.buffer.clone()));
        let evaluator = Arc::new(AlertEvaluator::new(
            Arc::clone(&rules),
            Arc::new(notifier),
            &config.evaluator,
        ));
        let cleaner = Arc::new(RetentionCleaner::new(
            Arc::clone(&store),
            Arc::clone(&policies),
            config.cleaner.clone(),
        ));

        let (shutdown_tx, _) = broadcast::channel(1);
        let (eval_tx, eval_rx) = mpsc::channel(config.evaluator.queue_depth.max(1));

        let tasks = vec![
            Self::spawn_eval_worker(Arc::clone(&evaluator), eval_rx, shutdown_tx.subscribe()),
            buffer.spawn_flush_task(shutdown_tx.subscribe()),
            cleaner.spawn_cleanup_task(shutdown_tx.subscribe()),
        ];

        info!(
            high_water_mark = config.buffer.high_water_mark,
            cache_ttl_secs = config.cache.ttl.as_secs(),
            cleanup_interval_secs = config.cleaner.interval.as_secs(),
            "log engine started"
        );

        Self {
            inner: Arc::new(EngineInner {
                store,
                queries,
                buffer,
                evaluator,
                cleaner,
                rules,
                policies,
                config,
                eval_tx,
                shutdown_tx,
                closed: AtomicBool::new(false),
                tasks: Mutex::new(tasks),
            }),
        }
    }

    fn spawn_eval_worker(
        evaluator: Arc<AlertEvaluator<R, N>>,
        mut eval_rx: mpsc::Receiver<LogEntry>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    entry = eval_rx.recv() => {
                        match entry {
                            Some(entry) => evaluator.evaluate(&entry).await,
                            None => break,
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("evaluation worker shutting down");
                        break;
                    }
                }
            }
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(EngineError::Closed);
        }
        Ok(())
    }

    /// Assigns ingestion defaults and validates the entry.
    fn prepare(entry: &mut LogEntry) -> Result<()> {
        if entry.id.is_none() {
            entry.id = Some(Uuid::new_v4());
        }
        if entry.timestamp.is_none() {
            entry.timestamp = Some(Utc::now());
        }
        entry.validate()?;
        Ok(())
    }

    fn enqueue_evaluation(&self, entry: LogEntry) {
        if let Err(err) = self.inner.eval_tx.try_send(entry) {
            debug!(error = %err, "alert evaluation dropped");
        }
    }

    // ===========================================
    // Ingestion
    // ===========================================

    /// Ingests one entry: assigns defaults, validates, writes it durably,
    /// and queues it for alert evaluation.
    ///
    /// # Errors
    ///
    /// Returns an error when the entry is invalid, the store write fails,
    /// or the engine is closed.
    pub async fn ingest_one(&self, mut entry: LogEntry) -> Result<LogEntry> {
        self.ensure_open()?;
        Self::prepare(&mut entry)?;
        self.inner.store.create(&entry).await?;
        self.enqueue_evaluation(entry.clone());
        Ok(entry)
    }

    /// Ingests a batch in one durable write.
    ///
    /// Only ERROR and FATAL entries are queued for alert evaluation on this
    /// path. An empty batch is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error when any entry is invalid, the batched write fails,
    /// or the engine is closed. The batch is all-or-nothing.
    pub async fn ingest_batch(&self, entries: Vec<LogEntry>) -> Result<Vec<LogEntry>> {
        self.ensure_open()?;
        if entries.is_empty() {
            return Ok(entries);
        }
        let mut prepared = entries;
        for entry in &mut prepared {
            Self::prepare(entry)?;
        }
        self.inner.store.create_batch(&prepared).await?;
        for entry in &prepared {
            if matches!(entry.level, LogLevel::Error | LogLevel::Fatal) {
                self.enqueue_evaluation(entry.clone());
            }
        }
        Ok(prepared)
    }

    /// Appends one entry to the ingestion buffer.
    ///
    /// The entry becomes durable at the next flush. Reaching the high-water
    /// mark schedules an asynchronous flush. No alert evaluation happens on
    /// this path.
    ///
    /// # Errors
    ///
    /// Returns an error when the entry is invalid or the engine is closed.
    pub async fn buffer_one(&self, mut entry: LogEntry) -> Result<LogEntry> {
        self.ensure_open()?;
        Self::prepare(&mut entry)?;
        if self.inner.buffer.submit(entry.clone()) {
            let buffer = Arc::clone(&self.inner.buffer);
            tokio::spawn(async move {
                // Flush failures are already recorded by the buffer.
                let _ = buffer.flush().await;
            });
        }
        Ok(entry)
    }

    /// Drains the ingestion buffer now. Returns the number written.
    ///
    /// # Errors
    ///
    /// Returns an error when the flush write fails, times out, or the
    /// engine is closed.
    pub async fn flush_now(&self) -> Result<usize> {
        self.ensure_open()?;
        self.inner.buffer.flush().await
    }

    // ===========================================
    // Queries
    // ===========================================

    /// Runs a filtered, paginated query through the cache layer.
    ///
    /// # Errors
    ///
    /// Returns an error when the store query fails or the engine is closed.
    /// Cache failures degrade to direct store reads.
    pub async fn query(&self, filter: &LogFilter) -> Result<LogQueryResult> {
        self.ensure_open()?;
        self.inner.queries.query(filter).await
    }

    /// Looks up one entry by id.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup fails or the engine is closed.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<LogEntry>> {
        self.ensure_open()?;
        Ok(self.inner.store.find_by_id(id).await?)
    }

    /// Returns all entries sharing a trace id, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup fails or the engine is closed.
    pub async fn find_by_trace_id(&self, trace_id: &str) -> Result<Vec<LogEntry>> {
        self.ensure_open()?;
        Ok(self.inner.store.find_by_trace_id(trace_id).await?)
    }

    /// Returns all entries sharing a request id, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup fails or the engine is closed.
    pub async fn find_by_request_id(&self, request_id: &str) -> Result<Vec<LogEntry>> {
        self.ensure_open()?;
        Ok(self.inner.store.find_by_request_id(request_id).await?)
    }

    /// Computes counts and time bounds over the selected entries.
    ///
    /// # Errors
    ///
    /// Returns an error when the computation fails or the engine is closed.
    pub async fn stats(
        &self,
        tenant_id: Option<TenantId>,
        range: Option<TimeRange>,
    ) -> Result<LogStats> {
        self.ensure_open()?;
        Ok(self.inner.store.stats(tenant_id, range).await?)
    }

    /// Buckets matching entries by time interval, ascending.
    ///
    /// # Errors
    ///
    /// Returns an error when the aggregation fails or the engine is closed.
    pub async fn aggregate(
        &self,
        filter: &LogFilter,
        interval: AggregateInterval,
    ) -> Result<Vec<AggregateBucket>> {
        self.ensure_open()?;
        Ok(self.inner.store.aggregate(filter, interval).await?)
    }

    /// Lists distinct service names, sorted ascending.
    ///
    /// # Errors
    ///
    /// Returns an error when the listing fails or the engine is closed.
    pub async fn list_services(&self, tenant_id: Option<TenantId>) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.inner.store.list_services(tenant_id).await?)
    }

    /// Estimates stored bytes for a tenant, or all tenants.
    ///
    /// # Errors
    ///
    /// Returns an error when the estimate fails or the engine is closed.
    pub async fn storage_size(&self, tenant_id: Option<TenantId>) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.inner.store.estimate_storage_bytes(tenant_id).await?)
    }

    /// Opens a polling tail stream over entries matching the filter.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine is closed.
    pub fn tail(&self, filter: LogFilter, poll_interval: Duration) -> Result<LogTail> {
        self.ensure_open()?;
        Ok(spawn_tail_task(
            Arc::clone(&self.inner.queries),
            filter,
            poll_interval,
            self.inner.shutdown_tx.subscribe(),
        ))
    }

    // ===========================================
    // Alert Rules
    // ===========================================

    /// Persists a new alert rule.
    ///
    /// # Errors
    ///
    /// Returns an error when the rule cannot be stored or the engine is
    /// closed.
    pub async fn create_alert_rule(&self, rule: AlertRule) -> Result<AlertRule> {
        self.ensure_open()?;
        self.inner.rules.create(&rule).await?;
        info!(rule = %rule.name, tenant = %rule.tenant_id, "alert rule created");
        Ok(rule)
    }

    /// Replaces an existing alert rule and bumps its modification time.
    ///
    /// # Errors
    ///
    /// Returns an error when the rule does not exist, the update fails, or
    /// the engine is closed.
    pub async fn update_alert_rule(&self, mut rule: AlertRule) -> Result<AlertRule> {
        self.ensure_open()?;
        rule.updated_at = Utc::now();
        self.inner.rules.update(&rule).await?;
        Ok(rule)
    }

    /// Looks up an alert rule by id.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup fails or the engine is closed.
    pub async fn get_alert_rule(&self, id: Uuid) -> Result<Option<AlertRule>> {
        self.ensure_open()?;
        Ok(self.inner.rules.get(id).await?)
    }

    /// Lists alert rules, optionally for one tenant, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error when the listing fails or the engine is closed.
    pub async fn list_alert_rules(&self, tenant_id: Option<TenantId>) -> Result<Vec<AlertRule>> {
        self.ensure_open()?;
        Ok(self.inner.rules.list(tenant_id).await?)
    }

    /// Enables an alert rule.
    ///
    /// # Errors
    ///
    /// Returns an error when the rule does not exist or the engine is
    /// closed.
    pub async fn enable_alert_rule(&self, id: Uuid) -> Result<()> {
        self.ensure_open()?;
        Ok(self.inner.rules.set_enabled(id, true).await?)
    }

    /// Disables an alert rule. Disabled rules never trigger.
    ///
    /// # Errors
    ///
    /// Returns an error when the rule does not exist or the engine is
    /// closed.
    pub async fn disable_alert_rule(&self, id: Uuid) -> Result<()> {
        self.ensure_open()?;
        Ok(self.inner.rules.set_enabled(id, false).await?)
    }

    /// Removes an alert rule.
    ///
    /// # Errors
    ///
    /// Returns an error when the rule does not exist or the engine is
    /// closed.
    pub async fn delete_alert_rule(&self, id: Uuid) -> Result<()> {
        self.ensure_open()?;
        Ok(self.inner.rules.delete(id).await?)
    }

    // ===========================================
    // Retention Policies
    // ===========================================

    /// Creates or replaces a tenant's retention policy and bumps its
    /// modification time.
    ///
    /// # Errors
    ///
    /// Returns an error when the policy cannot be stored or the engine is
    /// closed.
    pub async fn upsert_retention_policy(
        &self,
        mut policy: RetentionPolicy,
    ) -> Result<RetentionPolicy> {
        self.ensure_open()?;
        policy.updated_at = Utc::now();
        self.inner.policies.upsert(&policy).await?;
        Ok(policy)
    }

    /// Looks up a tenant's retention policy.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup fails or the engine is closed.
    pub async fn get_retention_policy(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<RetentionPolicy>> {
        self.ensure_open()?;
        Ok(self.inner.policies.get(tenant_id).await?)
    }

    /// Returns the tenant's retention policy, or the engine default when
    /// the tenant has none of its own.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup fails or the engine is closed.
    pub async fn effective_retention_policy(&self, tenant_id: TenantId) -> Result<RetentionPolicy> {
        self.ensure_open()?;
        match self.inner.policies.get(tenant_id).await? {
            Some(policy) => Ok(policy),
            None => Ok(self.inner.cleaner.default_policy(tenant_id)),
        }
    }

    /// Lists every stored retention policy.
    ///
    /// # Errors
    ///
    /// Returns an error when the listing fails or the engine is closed.
    pub async fn list_retention_policies(&self) -> Result<Vec<RetentionPolicy>> {
        self.ensure_open()?;
        Ok(self.inner.policies.list_all().await?)
    }

    /// Removes a tenant's retention policy.
    ///
    /// # Errors
    ///
    /// Returns an error when the policy does not exist or the engine is
    /// closed.
    pub async fn delete_retention_policy(&self, tenant_id: TenantId) -> Result<()> {
        self.ensure_open()?;
        Ok(self.inner.policies.delete(tenant_id).await?)
    }

    /// Runs one retention cleanup pass now.
    ///
    /// # Errors
    ///
    /// Returns an error when the policies cannot be loaded or the engine is
    /// closed.
    pub async fn cleanup_now(&self) -> Result<CleanupSummary> {
        self.ensure_open()?;
        self.inner.cleaner.cleanup().await
    }

    // ===========================================
    // Observability
    // ===========================================

    /// Entries waiting in the ingestion buffer.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.inner.buffer.pending_len()
    }

    /// Total entries written by buffer flushes.
    #[must_use]
    pub fn flushed_entries(&self) -> u64 {
        self.inner.buffer.flushed_entries()
    }

    /// Buffer flushes that failed or timed out.
    #[must_use]
    pub fn failed_flushes(&self) -> u64 {
        self.inner.buffer.failed_flushes()
    }

    /// Queries answered from the cache.
    #[must_use]
    pub fn cache_hits(&self) -> u64 {
        self.inner.queries.hits()
    }

    /// Queries that fell through to the store.
    #[must_use]
    pub fn cache_misses(&self) -> u64 {
        self.inner.queries.misses()
    }

    /// Alert notifications sent.
    #[must_use]
    pub fn alerts_triggered(&self) -> u64 {
        self.inner.evaluator.triggered_total()
    }

    /// Alert matches dropped by the per-rule cooldown.
    #[must_use]
    pub fn alerts_suppressed(&self) -> u64 {
        self.inner.evaluator.suppressed_total()
    }

    /// The configuration the engine was constructed with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Whether `close` has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    // ===========================================
    // Lifecycle
    // ===========================================

    /// Shuts the engine down.
    ///
    /// Marks the engine closed, signals every background task to stop and
    /// awaits them, then drains the ingestion buffer with one final flush.
    /// Evaluations still queued are abandoned. A second call is a no-op.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("log engine closing");
        let _ = self.inner.shutdown_tx.send(());

        let handles = std::mem::take(&mut *self.inner.tasks.lock());
        for handle in handles {
            let _ = handle.await;
        }

        match self.inner.buffer.flush().await {
            Ok(written) if written > 0 => {
                info!(written, "drained ingestion buffer on close");
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "final flush failed on close");
            }
        }
        info!("log engine closed");
    }
}
