//! Aggregation and Rollup Benchmarks
//!
//! Measures windowed aggregation over mixed-type records and full rollup
//! passes over a day of retained data.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kuba_rollup::aggregation::{aggregate, AggregationPolicy, FieldPolicy};
use kuba_rollup::config::RollupConfig;
use kuba_rollup::rollup::{ManualClock, RollupOrchestrator, TimeseriesContainer};
use kuba_rollup::types::Record;
use std::hint::black_box;

const HOUR: i64 = 3_600_000;
const DAY: i64 = 24 * HOUR;
const START: i64 = 1_700_000_000_000;

// =============================================================================
// Test Data Generators
// =============================================================================

/// Numeric-only records (typical monitoring metrics)
fn create_numeric_records(count: usize, step_ms: i64) -> Vec<Record> {
    (0..count)
        .map(|i| {
            Record::new(START + i as i64 * step_ms)
                .with_field("cpu", 50.0 + (i as f64 * 0.1).sin() * 10.0)
                .with_field("mem", 1024 + (i % 64) as i64)
        })
        .collect()
}

/// Records mixing numbers, labels and tag lists
fn create_mixed_records(count: usize, step_ms: i64) -> Vec<Record> {
    let hosts = ["web-1", "web-2", "web-3", "db-1"];
    (0..count)
        .map(|i| {
            Record::new(START + i as i64 * step_ms)
                .with_field("latency", 20.0 + (i % 17) as f64)
                .with_field("requests", (i % 9) as i64)
                .with_field("host", hosts[i % hosts.len()])
                .with_field("status", if i % 50 == 0 { 500 } else { 200 })
        })
        .collect()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    let policy = AggregationPolicy::new()
        .with("requests", FieldPolicy::Sum)
        .with("status", FieldPolicy::Dist);

    for size in [1_000usize, 10_000, 100_000] {
        let numeric = create_numeric_records(size, 1_000);
        let mixed = create_mixed_records(size, 1_000);

        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("numeric", size), &numeric, |b, records| {
            b.iter(|| aggregate(black_box(records), Some(HOUR), None))
        });

        group.bench_with_input(BenchmarkId::new("mixed_policy", size), &mixed, |b, records| {
            b.iter(|| aggregate(black_box(records), Some(HOUR), Some(&policy)))
        });
    }

    group.finish();
}

fn bench_rollup_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("rollup_pass");

    // One record every 10s across the 24h raw window
    let records = create_mixed_records((DAY / 10_000) as usize, 10_000);
    let now = START + DAY;
    let orchestrator =
        RollupOrchestrator::with_clock(RollupConfig::default(), Arc::new(ManualClock::new(now)));

    let mut base = TimeseriesContainer::new();
    base.store_mut().ingest_batch(records.iter().cloned());

    group.throughput(Throughput::Elements(records.len() as u64));
    group.bench_function("full_day", |b| {
        b.iter_batched(
            || base.clone(),
            |mut container| {
                orchestrator.run_pass_at(&mut container, now);
                container
            },
            criterion::BatchSize::LargeInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_aggregate, bench_rollup_pass);
criterion_main!(benches);
