//! Integration tests for the assembled log engine.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures::StreamExt;
use sawmill_engine::testing::{
    CollectingNotifier, CountingEntryStore, FailingCache, FlakyRuleStore,
};
use sawmill_engine::{BufferConfig, CacheConfig, EngineConfig, EngineError, LogEngine};
use sawmill_model::{
    AggregateInterval, AlertRule, LogEntry, LogFilter, LogLevel, RetentionPolicy, TenantId,
};
use sawmill_store::{AlertRuleStore, MemoryResultCache, MemoryRetentionPolicyStore};

type TestEngine = LogEngine<
    CountingEntryStore,
    MemoryResultCache,
    FlakyRuleStore,
    MemoryRetentionPolicyStore,
    CollectingNotifier,
>;

fn engine_with(
    config: EngineConfig,
) -> (TestEngine, CountingEntryStore, FlakyRuleStore, CollectingNotifier) {
    let store = CountingEntryStore::new();
    let rules = FlakyRuleStore::new();
    let notifier = CollectingNotifier::new();
    let engine = LogEngine::new(
        store.clone(),
        MemoryResultCache::new(),
        rules.clone(),
        MemoryRetentionPolicyStore::new(),
        notifier.clone(),
        config,
    );
    (engine, store, rules, notifier)
}

fn entry(tenant: TenantId, service: &str, level: LogLevel, message: &str) -> LogEntry {
    LogEntry::builder()
        .tenant_id(tenant)
        .service_name(service)
        .level(level)
        .message(message)
        .build()
        .expect("build entry")
}

fn entry_at(
    tenant: TenantId,
    service: &str,
    level: LogLevel,
    message: &str,
    at: DateTime<Utc>,
) -> LogEntry {
    let mut entry = entry(tenant, service, level, message);
    entry.timestamp = Some(at);
    entry
}

async fn error_rule(rules: &FlakyRuleStore, tenant: TenantId, name: &str) -> AlertRule {
    let rule = AlertRule::builder(name, tenant)
        .filter(LogFilter::new().with_tenant(tenant).with_level(LogLevel::Error))
        .build()
        .expect("build rule");
    rules.create(&rule).await.expect("create rule");
    rule
}

// ===========================================
// Buffered Ingestion
// ===========================================

#[tokio::test]
async fn test_timer_flush_persists_buffered_entries() {
    let config = EngineConfig {
        buffer: BufferConfig {
            flush_interval: Duration::from_millis(60),
            ..Default::default()
        },
        ..Default::default()
    };
    let (engine, store, _, _) = engine_with(config);
    let tenant = TenantId::new();

    engine
        .buffer_one(entry(tenant, "api", LogLevel::Info, "first"))
        .await
        .expect("buffer");
    engine
        .buffer_one(entry(tenant, "api", LogLevel::Info, "second"))
        .await
        .expect("buffer");
    assert_eq!(store.stored_len(), 0);

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(store.stored_len(), 2);
    assert_eq!(store.batch_calls(), 1);
    assert_eq!(engine.flushed_entries(), 2);
    assert_eq!(engine.buffered_len(), 0);
    engine.close().await;
}

#[tokio::test]
async fn test_high_water_flush_without_timer() {
    let config = EngineConfig {
        buffer: BufferConfig {
            high_water_mark: 3,
            flush_interval: Duration::from_secs(60),
            ..Default::default()
        },
        ..Default::default()
    };
    let (engine, store, _, _) = engine_with(config);
    let tenant = TenantId::new();

    for message in ["one", "two", "three"] {
        engine
            .buffer_one(entry(tenant, "api", LogLevel::Info, message))
            .await
            .expect("buffer");
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(store.stored_len(), 3);
    assert_eq!(engine.buffered_len(), 0);
    engine.close().await;
}

#[tokio::test]
async fn test_failed_flush_drops_batch_and_counts() {
    let (engine, store, _, _) = engine_with(EngineConfig::default());
    let tenant = TenantId::new();

    engine
        .buffer_one(entry(tenant, "api", LogLevel::Info, "doomed"))
        .await
        .expect("buffer");
    store.fail_writes(true);

    let err = engine.flush_now().await.unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
    assert_eq!(engine.failed_flushes(), 1);
    assert_eq!(engine.buffered_len(), 0);

    // The dropped batch is not retried by later flushes.
    store.fail_writes(false);
    assert_eq!(engine.flush_now().await.expect("flush"), 0);
    assert_eq!(store.stored_len(), 0);
    engine.close().await;
}

// ===========================================
// Alerting
// ===========================================

#[tokio::test]
async fn test_error_burst_alerts_once_per_cooldown() {
    let (engine, _, rules, notifier) = engine_with(EngineConfig::default());
    let tenant = TenantId::new();
    error_rule(&rules, tenant, "api errors").await;

    for i in 0..100 {
        engine
            .ingest_one(entry(tenant, "api", LogLevel::Error, &format!("failure {i}")))
            .await
            .expect("ingest");
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(notifier.count(), 1);
    assert_eq!(engine.alerts_triggered(), 1);
    assert_eq!(engine.alerts_suppressed(), 99);
    engine.close().await;
}

#[tokio::test]
async fn test_batch_path_skips_non_error_levels() {
    let (engine, _, rules, notifier) = engine_with(EngineConfig::default());
    let tenant = TenantId::new();

    let rule = AlertRule::builder("warn watcher", tenant)
        .filter(LogFilter::new().with_tenant(tenant).with_level(LogLevel::Warn))
        .build()
        .expect("build rule");
    rules.create(&rule).await.expect("create rule");

    // A warning inside a batch is not evaluated.
    engine
        .ingest_batch(vec![entry(tenant, "api", LogLevel::Warn, "batched warning")])
        .await
        .expect("ingest batch");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(notifier.count(), 0);

    // The same entry through the single path is.
    engine
        .ingest_one(entry(tenant, "api", LogLevel::Warn, "single warning"))
        .await
        .expect("ingest");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(notifier.count(), 1);
    engine.close().await;
}

#[tokio::test]
async fn test_disabled_rule_stays_silent() {
    let (engine, _, rules, notifier) = engine_with(EngineConfig::default());
    let tenant = TenantId::new();
    let rule = error_rule(&rules, tenant, "muted").await;
    engine.disable_alert_rule(rule.id).await.expect("disable");

    engine
        .ingest_one(entry(tenant, "api", LogLevel::Error, "ignored"))
        .await
        .expect("ingest");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(notifier.count(), 0);
    engine.close().await;
}

#[tokio::test]
async fn test_rule_store_outage_never_blocks_ingestion() {
    let (engine, store, rules, notifier) = engine_with(EngineConfig::default());
    let tenant = TenantId::new();
    error_rule(&rules, tenant, "unreachable").await;
    rules.fail_listing(true);

    engine
        .ingest_one(entry(tenant, "api", LogLevel::Error, "still stored"))
        .await
        .expect("ingest");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(store.stored_len(), 1);
    assert_eq!(notifier.count(), 0);
    engine.close().await;
}

// ===========================================
// Cached Queries
// ===========================================

#[tokio::test]
async fn test_cache_serves_stale_results_until_ttl() {
    let config = EngineConfig {
        cache: CacheConfig {
            ttl: Duration::from_millis(80),
        },
        ..Default::default()
    };
    let (engine, store, _, _) = engine_with(config);
    let tenant = TenantId::new();
    let filter = LogFilter::new().with_tenant(tenant);

    engine
        .ingest_one(entry(tenant, "api", LogLevel::Info, "first"))
        .await
        .expect("ingest");
    assert_eq!(engine.query(&filter).await.expect("query").total_count, 1);

    // A second write lands behind the cached result.
    engine
        .ingest_one(entry(tenant, "api", LogLevel::Info, "second"))
        .await
        .expect("ingest");
    assert_eq!(engine.query(&filter).await.expect("query").total_count, 1);
    assert_eq!(store.query_calls(), 1);

    // The TTL expires and the next query sees both entries.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(engine.query(&filter).await.expect("query").total_count, 2);
    assert_eq!(store.query_calls(), 2);
    engine.close().await;
}

#[tokio::test]
async fn test_cache_outage_degrades_to_store_reads() {
    let store = CountingEntryStore::new();
    let cache = FailingCache::new();
    let engine = LogEngine::new(
        store.clone(),
        cache.clone(),
        FlakyRuleStore::new(),
        MemoryRetentionPolicyStore::new(),
        CollectingNotifier::new(),
        EngineConfig::default(),
    );
    let tenant = TenantId::new();

    engine
        .ingest_one(entry(tenant, "api", LogLevel::Info, "present"))
        .await
        .expect("ingest");

    let filter = LogFilter::new().with_tenant(tenant);
    for _ in 0..2 {
        let page = engine.query(&filter).await.expect("query");
        assert_eq!(page.total_count, 1);
    }
    assert_eq!(store.query_calls(), 2);
    assert!(cache.get_calls() >= 2);
    engine.close().await;
}

// ===========================================
// Queries and Aggregation
// ===========================================

#[tokio::test]
async fn test_pagination_orders_newest_first() {
    let (engine, _, _, _) = engine_with(EngineConfig::default());
    let tenant = TenantId::new();
    let base = Utc::now();

    for i in 0..25 {
        engine
            .ingest_one(entry_at(
                tenant,
                "api",
                LogLevel::Info,
                &format!("event {i}"),
                base + chrono::Duration::milliseconds(i),
            ))
            .await
            .expect("ingest");
    }

    let filter = LogFilter::new().with_tenant(tenant).with_page_size(10);
    let first = engine.query(&filter).await.expect("query");
    assert_eq!(first.entries.len(), 10);
    assert_eq!(first.total_count, 25);
    assert!(first.has_more);
    assert_eq!(first.entries[0].message, "event 24");

    let last = engine
        .query(&filter.clone().with_page(3))
        .await
        .expect("query");
    assert_eq!(last.entries.len(), 5);
    assert!(!last.has_more);
    assert_eq!(last.entries[4].message, "event 0");
    engine.close().await;
}

#[tokio::test]
async fn test_request_correlation_ascending() {
    let (engine, _, _, _) = engine_with(EngineConfig::default());
    let tenant = TenantId::new();
    let base = Utc::now();

    for (i, stage) in ["received", "validated", "completed"].iter().enumerate() {
        let mut e = entry_at(
            tenant,
            "api",
            LogLevel::Info,
            stage,
            base + chrono::Duration::milliseconds(i as i64),
        );
        e.request_id = Some("req-42".to_string());
        engine.ingest_one(e).await.expect("ingest");
    }

    let chain = engine.find_by_request_id("req-42").await.expect("lookup");
    let messages: Vec<&str> = chain.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["received", "validated", "completed"]);
    engine.close().await;
}

#[tokio::test]
async fn test_hourly_aggregation_buckets_ascend() {
    let (engine, _, _, _) = engine_with(EngineConfig::default());
    let tenant = TenantId::new();

    // Two entries in the 14:00 bucket, one in the 16:00 bucket.
    for (hour, minute) in [(14, 5), (14, 20), (16, 5)] {
        let at = Utc
            .with_ymd_and_hms(2026, 3, 12, hour, minute, 0)
            .single()
            .expect("valid timestamp");
        engine
            .ingest_one(entry_at(tenant, "api", LogLevel::Info, "sample", at))
            .await
            .expect("ingest");
    }

    let buckets = engine
        .aggregate(
            &LogFilter::new().with_tenant(tenant),
            AggregateInterval::Hour,
        )
        .await
        .expect("aggregate");
    assert_eq!(buckets.len(), 2);
    assert!(buckets[0].bucket_start < buckets[1].bucket_start);
    assert_eq!(buckets[0].count, 2);
    assert_eq!(buckets[1].count, 1);
    engine.close().await;
}

#[tokio::test]
async fn test_stats_services_and_storage() {
    let (engine, _, _, _) = engine_with(EngineConfig::default());
    let tenant = TenantId::new();

    engine
        .ingest_one(entry(tenant, "billing", LogLevel::Error, "charge failed"))
        .await
        .expect("ingest");
    engine
        .ingest_one(entry(tenant, "api", LogLevel::Info, "request served"))
        .await
        .expect("ingest");

    let stats = engine.stats(Some(tenant), None).await.expect("stats");
    assert_eq!(stats.total_count, 2);
    assert_eq!(stats.level_counts.get(&LogLevel::Error), Some(&1));
    assert_eq!(stats.service_counts.get("billing"), Some(&1));

    let services = engine.list_services(Some(tenant)).await.expect("services");
    assert_eq!(services, vec!["api".to_string(), "billing".to_string()]);

    assert!(engine.storage_size(Some(tenant)).await.expect("size") > 0);
    assert!(engine.storage_size(None).await.expect("size") > 0);
    engine.close().await;
}

// ===========================================
// Retention
// ===========================================

#[tokio::test]
async fn test_cleanup_enforces_policy_and_default_boundaries() {
    let (engine, store, _, _) = engine_with(EngineConfig::default());
    let tenant_a = TenantId::new();
    let tenant_b = TenantId::new();
    let now = Utc::now();

    engine
        .upsert_retention_policy(RetentionPolicy::new(tenant_a, 7))
        .await
        .expect("upsert");

    for (tenant, days_old, message) in [
        (tenant_a, 8, "a expired"),
        (tenant_a, 6, "a retained"),
        (tenant_b, 40, "b expired by default"),
        (tenant_b, 10, "b retained by default"),
    ] {
        engine
            .ingest_one(entry_at(
                tenant,
                "api",
                LogLevel::Info,
                message,
                now - chrono::Duration::days(days_old),
            ))
            .await
            .expect("ingest");
    }

    let summary = engine.cleanup_now().await.expect("cleanup");
    assert_eq!(summary.tenants_processed, 1);
    assert_eq!(summary.entries_removed, 1);
    assert_eq!(summary.default_pass_removed, 1);
    assert!(!summary.deadline_reached);
    assert_eq!(store.stored_len(), 2);

    let a_left = engine
        .query(&LogFilter::new().with_tenant(tenant_a))
        .await
        .expect("query");
    assert_eq!(a_left.entries.len(), 1);
    assert_eq!(a_left.entries[0].message, "a retained");

    let b_left = engine
        .query(&LogFilter::new().with_tenant(tenant_b))
        .await
        .expect("query");
    assert_eq!(b_left.entries.len(), 1);
    assert_eq!(b_left.entries[0].message, "b retained by default");
    engine.close().await;
}

// ===========================================
// Tail
// ===========================================

#[tokio::test]
async fn test_tail_streams_only_new_entries() {
    let (engine, _, _, _) = engine_with(EngineConfig::default());
    let tenant = TenantId::new();

    engine
        .ingest_one(entry(tenant, "api", LogLevel::Info, "before tail"))
        .await
        .expect("ingest");

    let mut tail = engine
        .tail(
            LogFilter::new().with_tenant(tenant),
            Duration::from_millis(25),
        )
        .expect("tail");

    engine
        .ingest_one(entry(tenant, "api", LogLevel::Info, "after tail"))
        .await
        .expect("ingest");

    let streamed = tokio::time::timeout(Duration::from_secs(1), tail.next())
        .await
        .expect("tail produced nothing")
        .expect("stream ended");
    assert_eq!(streamed.message, "after tail");

    // Closing the engine ends the stream.
    engine.close().await;
    let end = tokio::time::timeout(Duration::from_secs(1), tail.next())
        .await
        .expect("stream did not end");
    assert!(end.is_none());
}

// ===========================================
// Lifecycle
// ===========================================

#[tokio::test]
async fn test_close_drains_and_rejects() {
    let (engine, store, _, _) = engine_with(EngineConfig::default());
    let tenant = TenantId::new();

    engine
        .ingest_one(entry(tenant, "api", LogLevel::Info, "durable"))
        .await
        .expect("ingest");
    engine
        .buffer_one(entry(tenant, "api", LogLevel::Info, "buffered"))
        .await
        .expect("buffer");

    engine.close().await;
    engine.close().await;

    assert_eq!(store.stored_len(), 2);
    assert!(engine.is_closed());
    assert!(matches!(
        engine
            .ingest_one(entry(tenant, "api", LogLevel::Info, "late"))
            .await,
        Err(EngineError::Closed)
    ));
    assert!(matches!(
        engine.query(&LogFilter::new()).await,
        Err(EngineError::Closed)
    ));
    assert!(matches!(
        engine.cleanup_now().await,
        Err(EngineError::Closed)
    ));
}
