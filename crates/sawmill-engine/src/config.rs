//! Engine configuration.

use std::time::Duration;

use sawmill_model::DEFAULT_RETENTION_DAYS;

/// Configuration for the ingestion buffer.
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Number of buffered entries that triggers an immediate flush.
    pub high_water_mark: usize,
    /// How often the buffer is flushed regardless of fill level.
    pub flush_interval: Duration,
    /// Upper bound on a single flush write.
    pub write_timeout: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            high_water_mark: 1000,
            flush_interval: Duration::from_secs(5),
            write_timeout: Duration::from_secs(30),
        }
    }
}

/// Configuration for the query cache layer.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a cached query result stays valid.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
        }
    }
}

/// Configuration for the alert evaluator.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Minimum time between two notifications of the same rule.
    pub cooldown: Duration,
    /// Capacity of the evaluation queue. Entries beyond it are dropped.
    pub queue_depth: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(60),
            queue_depth: 256,
        }
    }
}

/// Configuration for the retention cleaner.
#[derive(Debug, Clone)]
pub struct CleanerConfig {
    /// How often a cleanup run starts.
    pub interval: Duration,
    /// Upper bound on a single run. Tenants not reached within it are
    /// picked up by the next run.
    pub max_run_time: Duration,
    /// Retention window applied to tenants without their own policy.
    pub default_retention_days: i64,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
            max_run_time: Duration::from_secs(60 * 60),
            default_retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Ingestion buffer settings.
    pub buffer: BufferConfig,
    /// Query cache settings.
    pub cache: CacheConfig,
    /// Alert evaluator settings.
    pub evaluator: EvaluatorConfig,
    /// Retention cleaner settings.
    pub cleaner: CleanerConfig,
}
