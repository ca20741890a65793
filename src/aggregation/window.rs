//! Gap-triggered windowing
//!
//! Records are sorted by timestamp and walked once. The first window of a
//! call is anchored on the grid (`floor(ts / resolution) * resolution`);
//! every later window is anchored on the raw timestamp of its first record
//! and opens only when a record lands more than one resolution past the
//! current anchor. Bucket boundaries therefore drift with the data rather
//! than following a fixed calendar grid, and each window's label is its
//! anchor floored to the resolution.
//!
//! ```text
//!  resolution = 1h
//!  ts:      0:00:01  0:00:02        1:00:00.001   1:30   2:00:00.002
//!           |--------window A (anchor 0)-------|
//!                                  |---window B (anchor 1:00:00.001)---|
//!  labels:  A -> 0:00              B -> 1:00
//! ```

use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{AggregateRecord, Sample, DATAPOINTS_FIELD};

use super::accumulator::FieldAccumulator;
use super::policy::AggregationPolicy;

/// Default resolution: one hour in milliseconds
pub const DEFAULT_RESOLUTION_MS: i64 = 60 * 60 * 1000;

/// Resolve an optional resolution, treating absent or non-positive as one hour
pub fn effective_resolution(resolution: Option<i64>) -> i64 {
    match resolution {
        Some(r) if r > 0 => r,
        _ => DEFAULT_RESOLUTION_MS,
    }
}

/// Bucket label for a timestamp: `floor(ts / resolution) * resolution`
///
/// Floors toward negative infinity, so pre-epoch timestamps land in the
/// bucket that starts before them. Labels that would fall below `i64::MIN`
/// saturate to it.
pub fn bucket_label(ts: i64, resolution: i64) -> i64 {
    ts.div_euclid(resolution).saturating_mul(resolution)
}

/// State of the window currently being filled
#[derive(Debug)]
struct WindowState {
    /// Reference timestamp the window is positioned on
    anchor: i64,

    /// One accumulator per field seen in this window
    accumulators: BTreeMap<String, FieldAccumulator>,

    /// Records folded into this window
    datapoints: u64,
}

impl WindowState {
    fn open(anchor: i64) -> Self {
        Self {
            anchor,
            accumulators: BTreeMap::new(),
            datapoints: 0,
        }
    }

    /// A record past `anchor + resolution` closes this window
    fn admits(&self, ts: i64, resolution: i64) -> bool {
        ts <= self.anchor.saturating_add(resolution)
    }

    fn fold<S: Sample + ?Sized>(&mut self, record: &S, policy: &AggregationPolicy) {
        for (name, value) in record.fields() {
            if name == DATAPOINTS_FIELD {
                continue;
            }

            let rule = policy.get(name);
            match self.accumulators.get_mut(name) {
                Some(acc) => {
                    if !acc.fold(rule, value) {
                        debug!(
                            field = %name,
                            value_type = value.type_name(),
                            anchor = self.anchor,
                            "Skipping value that does not fit the field's accumulator"
                        );
                    }
                },
                None => {
                    if let Some(acc) = FieldAccumulator::start(rule, value) {
                        self.accumulators.insert(name.clone(), acc);
                    }
                },
            }
        }
        self.datapoints += 1;
    }

    fn finish(self, resolution: i64) -> AggregateRecord {
        AggregateRecord {
            ts: bucket_label(self.anchor, resolution),
            datapoints: self.datapoints,
            fields: self
                .accumulators
                .into_iter()
                .map(|(name, acc)| (name, acc.value()))
                .collect(),
        }
    }
}

/// Fold records into one aggregate record per window
///
/// - `resolution`: window length in milliseconds; `None` or `<= 0` means one hour
/// - `policy`: per-field rules; `None` means type-driven defaults everywhere
///
/// The input is not modified. Output is ordered by window anchor, which is
/// also ascending bucket label order. Empty input yields empty output.
///
/// # Example
///
/// ```rust
/// use kuba_rollup::aggregation::aggregate;
/// use kuba_rollup::types::Record;
///
/// let records = vec![
///     Record::new(1_000).with_field("v", 10),
///     Record::new(2_000).with_field("v", 20),
///     Record::new(3_600_001).with_field("v", 30),
/// ];
///
/// let buckets = aggregate(&records, Some(3_600_000), None);
/// assert_eq!(buckets.len(), 2);
/// assert_eq!(buckets[0].ts, 0);
/// assert_eq!(buckets[0].get_f64("v"), Some(15.0));
/// assert_eq!(buckets[0].datapoints, 2);
/// assert_eq!(buckets[1].ts, 3_600_000);
/// assert_eq!(buckets[1].datapoints, 1);
/// ```
pub fn aggregate<'a, S, I>(
    records: I,
    resolution: Option<i64>,
    policy: Option<&AggregationPolicy>,
) -> Vec<AggregateRecord>
where
    S: Sample + 'a,
    I: IntoIterator<Item = &'a S>,
{
    let resolution = effective_resolution(resolution);
    let empty = AggregationPolicy::default();
    let policy = policy.unwrap_or(&empty);

    let mut sorted: Vec<&S> = records.into_iter().collect();
    sorted.sort_unstable_by_key(|r| r.timestamp());

    let mut windows: BTreeMap<i64, AggregateRecord> = BTreeMap::new();
    let mut current: Option<WindowState> = None;

    for record in sorted {
        let ts = record.timestamp();

        let mut window = match current.take() {
            None => WindowState::open(bucket_label(ts, resolution)),
            Some(w) if w.admits(ts, resolution) => w,
            Some(w) => {
                windows.insert(w.anchor, w.finish(resolution));
                WindowState::open(ts)
            },
        };

        window.fold(record, policy);
        current = Some(window);
    }

    if let Some(w) = current {
        windows.insert(w.anchor, w.finish(resolution));
    }

    windows.into_values().collect()
}
