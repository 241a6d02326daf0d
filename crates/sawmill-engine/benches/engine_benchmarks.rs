//! Benchmarks for sawmill-engine.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sawmill_engine::{AlertEvaluator, TracingNotifier, cache_key};
use sawmill_model::{AlertRule, LogEntry, LogFilter, LogLevel, TenantId};
use sawmill_store::MemoryAlertRuleStore;

type Evaluator = AlertEvaluator<MemoryAlertRuleStore, TracingNotifier>;

fn bench_entry(tenant: TenantId) -> LogEntry {
    LogEntry::builder()
        .tenant_id(tenant)
        .service_name("payment-api")
        .level(LogLevel::Error)
        .message("charge declined by upstream processor")
        .trace_id("trace-bench-1")
        .request_id("req-bench-1")
        .environment("production")
        .build()
        .unwrap()
}

fn benchmark_filter_match(c: &mut Criterion) {
    let tenant = TenantId::new();
    let entry = bench_entry(tenant);
    let filter = LogFilter::new()
        .with_tenant(tenant)
        .with_service("payment-api")
        .with_min_level(LogLevel::Warn)
        .with_contains("declined");

    c.bench_function("filter_match", |b| {
        b.iter(|| filter.matches(black_box(&entry)));
    });
}

fn benchmark_cache_key(c: &mut Criterion) {
    let filter = LogFilter::new()
        .with_tenant(TenantId::new())
        .with_service("payment-api")
        .with_level(LogLevel::Error)
        .with_page(3)
        .with_page_size(50);

    c.bench_function("cache_key", |b| {
        b.iter(|| cache_key(black_box(&filter)).unwrap());
    });
}

fn benchmark_rule_match(c: &mut Criterion) {
    let tenant = TenantId::new();
    let entry = bench_entry(tenant);
    let rule = AlertRule::builder("payment errors", tenant)
        .filter(
            LogFilter::new()
                .with_tenant(tenant)
                .with_service("payment-api")
                .with_level(LogLevel::Error),
        )
        .build()
        .unwrap();

    c.bench_function("rule_match", |b| {
        b.iter(|| Evaluator::rule_matches(black_box(&rule), black_box(&entry)));
    });
}

fn benchmark_entry_serialization(c: &mut Criterion) {
    let entry = bench_entry(TenantId::new());

    c.bench_function("entry_serialization", |b| {
        b.iter(|| serde_json::to_vec(black_box(&entry)).unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_filter_match,
    benchmark_cache_key,
    benchmark_rule_match,
    benchmark_entry_serialization
);
criterion_main!(benches);
