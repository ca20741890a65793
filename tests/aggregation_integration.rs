//! Integration tests for the windowed aggregation engine
//!
//! These tests drive `aggregate` through the public API with records built
//! both in code and from JSON:
//! - Window assignment and labelling
//! - Type-driven field rules (average, distribution, union)
//! - Policy-driven field rules (sum, min, max, unique, dist, count)
//! - Re-aggregation of aggregate records

use kuba_rollup::aggregation::{aggregate, AggregationPolicy, FieldPolicy};
use kuba_rollup::types::{AggregateRecord, FieldValue, Record};
use serde_json::json;

const HOUR: i64 = 3_600_000;
const DAY: i64 = 24 * HOUR;

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a JSON array of flat records
fn records_from_json(value: serde_json::Value) -> Vec<Record> {
    value
        .as_array()
        .expect("array of records")
        .iter()
        .cloned()
        .map(|v| Record::from_json_value(v).expect("valid record"))
        .collect()
}

/// Ten minutes of request logs for two hosts
fn request_log(start: i64) -> Vec<Record> {
    (0..10)
        .map(|i| {
            Record::new(start + i * 60_000)
                .with_field("latency", 100 + i * 10)
                .with_field("requests", 5)
                .with_field("host", if i % 2 == 0 { "a" } else { "b" })
                .with_field("status", if i == 3 { 500 } else { 200 })
        })
        .collect()
}

// ============================================================================
// Windowing
// ============================================================================

#[test]
fn test_json_records_two_windows() {
    let records = records_from_json(json!([
        {"ts": 1000, "v": 10},
        {"ts": 2000, "v": 20},
        {"ts": 3600001, "v": 30}
    ]));

    let out = aggregate(&records, Some(HOUR), None);
    let as_json: Vec<serde_json::Value> =
        out.iter().map(|r| serde_json::to_value(r).unwrap()).collect();

    assert_eq!(
        as_json,
        vec![
            json!({"ts": 0, "_datapoints": 2, "v": 15}),
            json!({"ts": 3600000, "_datapoints": 1, "v": 30}),
        ]
    );
}

#[test]
fn test_every_record_lands_in_exactly_one_window() {
    let records: Vec<Record> = (0..500)
        .map(|i| Record::new(i * 97_003).with_field("v", i))
        .collect();

    let out = aggregate(&records, Some(HOUR), None);
    let total: u64 = out.iter().map(|r| r.datapoints).sum();
    assert_eq!(total, 500);

    // Labels are grid-aligned and strictly ascending
    for pair in out.windows(2) {
        assert!(pair[0].ts < pair[1].ts);
    }
    assert!(out.iter().all(|r| r.ts % HOUR == 0));
}

#[test]
fn test_resolution_controls_bucket_count() {
    let records = request_log(0);
    assert_eq!(aggregate(&records, Some(HOUR), None).len(), 1);
    assert_eq!(aggregate(&records, Some(120_000), None).len(), 4);
}

#[test]
fn test_input_order_does_not_matter() {
    let records = request_log(5 * HOUR);
    let mut reversed = records.clone();
    reversed.reverse();

    assert_eq!(
        aggregate(&records, Some(HOUR), None),
        aggregate(&reversed, Some(HOUR), None)
    );
}

// ============================================================================
// Field Rules
// ============================================================================

#[test]
fn test_type_driven_defaults() {
    let out = aggregate(&request_log(0), Some(HOUR), None);
    assert_eq!(out.len(), 1);
    let bucket = &out[0];

    // Numbers average
    assert_eq!(bucket.get_f64("latency"), Some(145.0));
    assert_eq!(bucket.get_f64("requests"), Some(5.0));

    // Strings tally
    let hosts = bucket.get("host").and_then(FieldValue::as_distribution).unwrap();
    assert_eq!(hosts["a"], 5.0);
    assert_eq!(hosts["b"], 5.0);

    assert_eq!(bucket.datapoints, 10);
}

#[test]
fn test_policy_driven_fields() {
    let policy = AggregationPolicy::new()
        .with("requests", FieldPolicy::Sum)
        .with("latency", FieldPolicy::Max)
        .with("status", FieldPolicy::Dist)
        .with("host", FieldPolicy::Unique);

    let out = aggregate(&request_log(0), Some(HOUR), Some(&policy));
    let bucket = &out[0];

    assert_eq!(bucket.get_f64("requests"), Some(50.0));
    assert_eq!(bucket.get_f64("latency"), Some(190.0));

    let status = bucket.get("status").and_then(FieldValue::as_distribution).unwrap();
    assert_eq!(status["200"], 9.0);
    assert_eq!(status["500"], 1.0);

    assert_eq!(
        bucket.get("host"),
        Some(&FieldValue::List(vec!["a".into(), "b".into()]))
    );
}

#[test]
fn test_min_policy() {
    let policy = AggregationPolicy::new().with("latency", FieldPolicy::Min);
    let out = aggregate(&request_log(0), Some(HOUR), Some(&policy));
    assert_eq!(out[0].get_f64("latency"), Some(100.0));
}

#[test]
fn test_count_policy_only_counts_datapoints() {
    let policy = AggregationPolicy::new().with("latency", FieldPolicy::Count);
    let out = aggregate(&request_log(0), Some(HOUR), Some(&policy));
    assert!(out[0].get("latency").is_none());
    assert_eq!(out[0].datapoints, 10);
}

#[test]
fn test_list_values_union_in_first_seen_order() {
    let records = records_from_json(json!([
        {"ts": 0, "tags": ["x", "y"]},
        {"ts": 1, "tags": ["y", "z"]},
        {"ts": 2, "tags": ["x"]}
    ]));

    let out = aggregate(&records, Some(HOUR), None);
    assert_eq!(
        out[0].get("tags"),
        Some(&FieldValue::List(vec!["x".into(), "y".into(), "z".into()]))
    );
}

#[test]
fn test_booleans_and_nulls_are_dropped() {
    let records = records_from_json(json!([
        {"ts": 0, "ok": true, "missing": null, "v": 1},
        {"ts": 1, "ok": false, "missing": null, "v": 2}
    ]));

    let out = aggregate(&records, Some(HOUR), None);
    assert!(out[0].get("ok").is_none());
    assert!(out[0].get("missing").is_none());
    assert_eq!(out[0].get_f64("v"), Some(1.5));
    assert_eq!(out[0].datapoints, 2);
}

#[test]
fn test_mismatched_kind_is_skipped() {
    // First value fixes the field as numeric; the string is ignored
    let records = records_from_json(json!([
        {"ts": 0, "v": 4},
        {"ts": 1, "v": "oops"},
        {"ts": 2, "v": 8}
    ]));

    let out = aggregate(&records, Some(HOUR), None);
    assert_eq!(out[0].get_f64("v"), Some(6.0));
    assert_eq!(out[0].datapoints, 3);
}

#[test]
fn test_results_rounded_when_shorter() {
    let records = vec![
        Record::new(0).with_field("v", 0.1),
        Record::new(1).with_field("v", 0.2),
        Record::new(2).with_field("v", 0.3),
    ];
    let out = aggregate(&records, Some(HOUR), None);
    assert_eq!(out[0].get_f64("v"), Some(0.2));

    let policy = AggregationPolicy::new().with("v", FieldPolicy::Sum);
    let out = aggregate(&records, Some(HOUR), Some(&policy));
    assert_eq!(out[0].get_f64("v"), Some(0.6));
}

// ============================================================================
// Re-aggregation
// ============================================================================

#[test]
fn test_hourly_to_daily_distribution_merge() {
    let hourly = vec![
        AggregateRecord::new(0, 3).with_field("host", FieldValue::Distribution(
            [("a".to_string(), 2.0), ("b".to_string(), 1.0)].into_iter().collect(),
        )),
        AggregateRecord::new(HOUR, 2).with_field("host", FieldValue::Distribution(
            [("b".to_string(), 2.0)].into_iter().collect(),
        )),
    ];

    let daily = aggregate(&hourly, Some(DAY), None);
    assert_eq!(daily.len(), 1);
    assert_eq!(daily[0].datapoints, 2);

    let hosts = daily[0].get("host").and_then(FieldValue::as_distribution).unwrap();
    assert_eq!(hosts["a"], 2.0);
    assert_eq!(hosts["b"], 3.0);
}

#[test]
fn test_sum_survives_two_levels() {
    let policy = AggregationPolicy::new().with("requests", FieldPolicy::Sum);
    let mut raw = request_log(0);
    raw.extend(request_log(3 * HOUR));

    let hourly = aggregate(&raw, Some(HOUR), Some(&policy));
    assert_eq!(hourly.len(), 2);

    let daily = aggregate(&hourly, Some(DAY), Some(&policy));
    assert_eq!(daily.len(), 1);
    assert_eq!(daily[0].get_f64("requests"), Some(100.0));
}

#[test]
fn test_aggregate_record_json_roundtrip() {
    let out = aggregate(&request_log(0), Some(HOUR), None);
    let text = serde_json::to_string(&out[0]).unwrap();
    let back: AggregateRecord = serde_json::from_str(&text).unwrap();
    assert_eq!(back, out[0]);
}
