//! Alert rule evaluation and notification delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use sawmill_model::{AlertRule, LogEntry};
use sawmill_store::AlertRuleStore;
use tracing::{debug, warn};

use crate::config::EvaluatorConfig;
use crate::error::Result;

/// Delivers alert notifications to an external channel.
#[allow(async_fn_in_trait)]
pub trait Notifier: Send + Sync + 'static {
    /// Delivers a notification for a rule that matched an entry.
    fn notify(
        &self,
        rule: &AlertRule,
        entry: &LogEntry,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Notifier that emits alerts to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    /// Creates a new tracing notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Notifier for TracingNotifier {
    async fn notify(&self, rule: &AlertRule, entry: &LogEntry) -> Result<()> {
        warn!(
            rule = %rule.name,
            severity = %rule.severity,
            tenant = %entry.tenant_id,
            service = %entry.service_name,
            level = %entry.level,
            message = %entry.message,
            "alert triggered"
        );
        Ok(())
    }
}

/// Evaluates enabled alert rules against ingested entries.
///
/// Evaluation is strictly best-effort: rule loading, trigger bookkeeping,
/// and notification failures are logged and swallowed, never surfacing to
/// the ingestion path.
#[derive(Debug)]
pub struct AlertEvaluator<R, N> {
    rules: Arc<R>,
    notifier: Arc<N>,
    cooldown: chrono::Duration,
    triggered_total: AtomicU64,
    suppressed_total: AtomicU64,
}

impl<R: AlertRuleStore, N: Notifier> AlertEvaluator<R, N> {
    /// Creates an evaluator over the given rule store and notifier.
    pub fn new(rules: Arc<R>, notifier: Arc<N>, config: &EvaluatorConfig) -> Self {
        let cooldown = chrono::Duration::from_std(config.cooldown)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        Self {
            rules,
            notifier,
            cooldown,
            triggered_total: AtomicU64::new(0),
            suppressed_total: AtomicU64::new(0),
        }
    }

    /// Total number of notifications sent.
    #[must_use]
    pub fn triggered_total(&self) -> u64 {
        self.triggered_total.load(Ordering::Relaxed)
    }

    /// Number of matches dropped by the per-rule cooldown.
    #[must_use]
    pub fn suppressed_total(&self) -> u64 {
        self.suppressed_total.load(Ordering::Relaxed)
    }

    /// Evaluates every enabled rule against one entry.
    ///
    /// Rules are reloaded on each call so that cooldown state recorded by a
    /// previous evaluation is visible to the next one.
    pub async fn evaluate(&self, entry: &LogEntry) {
        let rules = match self.rules.list_enabled().await {
            Ok(rules) => rules,
            Err(err) => {
                warn!(error = %err, "failed to load alert rules, skipping evaluation");
                return;
            }
        };

        for rule in &rules {
            if Self::rule_matches(rule, entry) {
                self.trigger(rule, entry).await;
            }
        }
    }

    /// Checks whether an entry matches a rule.
    ///
    /// Only the rule filter's service name, exact level, and tenant take
    /// part in matching; its remaining predicates are ignored here.
    #[must_use]
    pub fn rule_matches(rule: &AlertRule, entry: &LogEntry) -> bool {
        if let Some(ref service_name) = rule.filter.service_name {
            if entry.service_name != *service_name {
                return false;
            }
        }
        if let Some(level) = rule.filter.level {
            if entry.level != level {
                return false;
            }
        }
        if let Some(tenant_id) = rule.filter.tenant_id {
            if entry.tenant_id != tenant_id {
                return false;
            }
        }
        true
    }

    async fn trigger(&self, rule: &AlertRule, entry: &LogEntry) {
        let now = Utc::now();
        if rule.in_cooldown(now, self.cooldown) {
            self.suppressed_total.fetch_add(1, Ordering::Relaxed);
            debug!(rule = %rule.name, "alert suppressed by cooldown");
            return;
        }

        if let Err(err) = self.rules.update_last_triggered(rule.id, now).await {
            warn!(rule = %rule.name, error = %err, "failed to record trigger time");
        }
        // The notification goes out even when the trigger time could not be
        // recorded.
        if let Err(err) = self.notifier.notify(rule, entry).await {
            warn!(rule = %rule.name, error = %err, "alert notification failed");
        }
        self.triggered_total.fetch_add(1, Ordering::Relaxed);
    }
}
