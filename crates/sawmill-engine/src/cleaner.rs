//! Periodic enforcement of per-tenant retention policies.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sawmill_model::RetentionPolicy;
use sawmill_store::{EntryStore, RetentionPolicyStore};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CleanerConfig;
use crate::error::Result;

/// Outcome of one cleanup run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupSummary {
    /// Tenants whose policy was attempted before the run ended.
    pub tenants_processed: usize,
    /// Tenants whose deletion failed and was skipped this run.
    pub tenants_failed: usize,
    /// Entries removed by per-tenant policies.
    pub entries_removed: u64,
    /// Entries removed by the default retention pass.
    pub default_pass_removed: u64,
    /// Whether the run gave up on remaining tenants at its deadline.
    pub deadline_reached: bool,
}

/// Deletes entries that have aged past their tenant's retention policy.
///
/// Each run walks the configured policies and finishes with a default
/// pass that bounds every tenant, policy or not, at the configured
/// default retention.
#[derive(Debug)]
pub struct RetentionCleaner<S, P> {
    store: Arc<S>,
    policies: Arc<P>,
    config: CleanerConfig,
}

impl<S: EntryStore, P: RetentionPolicyStore> RetentionCleaner<S, P> {
    /// Creates a cleaner over the given entry and policy stores.
    pub fn new(store: Arc<S>, policies: Arc<P>, config: CleanerConfig) -> Self {
        Self {
            store,
            policies,
            config,
        }
    }

    /// Runs one cleanup pass.
    ///
    /// A tenant whose deletion fails is skipped for this run. If the run
    /// exceeds its deadline the remaining tenants are abandoned until the
    /// next run, but the default pass still executes.
    ///
    /// # Errors
    ///
    /// Returns an error only when the retention policies cannot be loaded.
    pub async fn cleanup(&self) -> Result<CleanupSummary> {
        let started = Instant::now();
        let policies = self.policies.list_all().await?;
        let now = Utc::now();
        let mut summary = CleanupSummary::default();

        for policy in &policies {
            if started.elapsed() >= self.config.max_run_time {
                warn!(
                    processed = summary.tenants_processed,
                    total = policies.len(),
                    "cleanup deadline reached, remaining tenants deferred to next run"
                );
                summary.deadline_reached = true;
                break;
            }
            summary.tenants_processed += 1;

            let cutoff = policy.cutoff_from(now);
            match self
                .store
                .delete_older_than(Some(policy.tenant_id), cutoff)
                .await
            {
                Ok(removed) => {
                    summary.entries_removed += removed;
                    if removed > 0 {
                        debug!(
                            tenant = %policy.tenant_id,
                            removed,
                            retention_days = policy.retention_days,
                            "applied retention policy"
                        );
                    }
                }
                Err(err) => {
                    summary.tenants_failed += 1;
                    warn!(
                        tenant = %policy.tenant_id,
                        error = %err,
                        "retention deletion failed, skipping tenant this run"
                    );
                }
            }
        }

        // The default pass runs unconditionally so that tenants without a
        // policy are still bounded.
        let default_cutoff = now - chrono::Duration::days(self.config.default_retention_days);
        match self.store.delete_older_than(None, default_cutoff).await {
            Ok(removed) => summary.default_pass_removed = removed,
            Err(err) => {
                warn!(error = %err, "default retention pass failed");
            }
        }

        Ok(summary)
    }

    /// Spawns a task that runs cleanup on the configured interval until
    /// shutdown is signalled.
    pub fn spawn_cleanup_task(
        self: &Arc<Self>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let cleaner = Arc::clone(self);
        let period = cleaner.config.interval;
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match cleaner.cleanup().await {
                            Ok(summary) => {
                                info!(
                                    tenants = summary.tenants_processed,
                                    failed = summary.tenants_failed,
                                    removed = summary.entries_removed,
                                    default_removed = summary.default_pass_removed,
                                    "retention cleanup finished"
                                );
                            }
                            Err(err) => {
                                warn!(error = %err, "retention cleanup failed");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("cleanup task shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Default cutoff applied when a tenant has no policy of its own.
    #[must_use]
    pub fn default_policy(&self, tenant_id: sawmill_model::TenantId) -> RetentionPolicy {
        RetentionPolicy::new(tenant_id, self.config.default_retention_days)
    }
}
