//! Hierarchical rollup orchestrator
//!
//! Every pass recomputes each tier from the current contents of the tier
//! below, then evicts whatever has aged out of each tier:
//!
//! ```text
//!   all ──aggregate(1h)──▶ hourly ──aggregate(24h)──▶ daily ──aggregate(~1mo)──▶ monthly
//!    │                      │                          │                          │
//!  evict < now-24h       evict < now-48h            evict < now-32d            never evicted
//! ```
//!
//! Tiers are recomputed and replaced per bucket, never merged
//! incrementally. An hourly bucket whose raw records have left the 24h raw
//! window is no longer recomputed and keeps its last value until it is
//! evicted at 48h; the daily tier is then recomputed from those frozen
//! buckets. Passes are not transactional and cannot fail.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::aggregation::aggregate;
use crate::config::RollupConfig;
use crate::types::Sample;

use super::store::{initialize_store, Tier, TimeseriesContainer};

// ============================================================================
// Clock
// ============================================================================

/// Source of "now" for retention cutoffs
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch
    fn now_ms(&self) -> i64;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }
}

/// Manually driven clock, for tests and replays
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `now_ms`
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    /// Move the clock to an absolute time
    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    /// Move the clock forward
    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Reports and statistics
// ============================================================================

/// Outcome of a single rollup pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollupReport {
    /// The `now` the pass ran at
    pub now_ms: i64,

    /// Hourly buckets written
    pub hourly_buckets: usize,

    /// Daily buckets written
    pub daily_buckets: usize,

    /// Monthly buckets written
    pub monthly_buckets: usize,

    /// Raw records evicted
    pub raw_evicted: usize,

    /// Hourly buckets evicted
    pub hourly_evicted: usize,

    /// Daily buckets evicted
    pub daily_evicted: usize,
}

impl RollupReport {
    /// Buckets written across all tiers
    pub fn buckets_written(&self) -> usize {
        self.hourly_buckets + self.daily_buckets + self.monthly_buckets
    }

    /// Entries evicted across all tiers
    pub fn evicted(&self) -> usize {
        self.raw_evicted + self.hourly_evicted + self.daily_evicted
    }
}

/// Cumulative statistics for an orchestrator
#[derive(Debug, Default)]
pub struct RollupStats {
    /// Passes completed
    pub passes: AtomicU64,

    /// Raw records read by the hourly tier
    pub records_aggregated: AtomicU64,

    /// Buckets written across all tiers
    pub buckets_written: AtomicU64,

    /// Entries evicted across all tiers
    pub entries_evicted: AtomicU64,
}

impl RollupStats {
    fn record_pass(&self, records: usize, report: &RollupReport) {
        self.passes.fetch_add(1, Ordering::Relaxed);
        self.records_aggregated
            .fetch_add(records as u64, Ordering::Relaxed);
        self.buckets_written
            .fetch_add(report.buckets_written() as u64, Ordering::Relaxed);
        self.entries_evicted
            .fetch_add(report.evicted() as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of current stats
    pub fn snapshot(&self) -> RollupStatsSnapshot {
        RollupStatsSnapshot {
            passes: self.passes.load(Ordering::Relaxed),
            records_aggregated: self.records_aggregated.load(Ordering::Relaxed),
            buckets_written: self.buckets_written.load(Ordering::Relaxed),
            entries_evicted: self.entries_evicted.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RollupStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollupStatsSnapshot {
    /// Passes completed
    pub passes: u64,
    /// Raw records read by the hourly tier
    pub records_aggregated: u64,
    /// Buckets written across all tiers
    pub buckets_written: u64,
    /// Entries evicted across all tiers
    pub entries_evicted: u64,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs rollup passes over a [`TimeseriesContainer`]
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use kuba_rollup::config::RollupConfig;
/// use kuba_rollup::rollup::{ManualClock, RollupOrchestrator, TimeseriesContainer};
/// use kuba_rollup::types::Record;
///
/// let now = 1_700_000_000_000;
/// let orchestrator =
///     RollupOrchestrator::with_clock(RollupConfig::default(), Arc::new(ManualClock::new(now)));
///
/// let mut container = TimeseriesContainer::new();
/// container.store_mut().ingest(Record::new(now - 1_000).with_field("cpu", 40));
/// container.store_mut().ingest(Record::new(now - 500).with_field("cpu", 60));
///
/// orchestrator.process(&mut container);
///
/// let store = container.store().unwrap();
/// assert_eq!(store.aggregates.hourly.len(), 1);
/// assert_eq!(store.aggregates.daily.len(), 1);
/// assert_eq!(store.aggregates.monthly.len(), 1);
/// ```
pub struct RollupOrchestrator {
    config: RollupConfig,
    clock: Arc<dyn Clock>,
    stats: RollupStats,
}

impl std::fmt::Debug for RollupOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollupOrchestrator")
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl Default for RollupOrchestrator {
    fn default() -> Self {
        Self::new(RollupConfig::default())
    }
}

impl RollupOrchestrator {
    /// Create an orchestrator driven by the system clock
    pub fn new(config: RollupConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create an orchestrator with a custom clock
    pub fn with_clock(config: RollupConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            stats: RollupStats::default(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &RollupConfig {
        &self.config
    }

    /// Snapshot of cumulative statistics
    pub fn stats(&self) -> RollupStatsSnapshot {
        self.stats.snapshot()
    }

    /// Run one pass at the clock's current time
    ///
    /// Returns the same container, mutated in place.
    pub fn process<'a>(&self, container: &'a mut TimeseriesContainer) -> &'a mut TimeseriesContainer {
        self.run_pass(container);
        container
    }

    /// Run one pass at an explicit time
    pub fn process_at<'a>(
        &self,
        container: &'a mut TimeseriesContainer,
        now_ms: i64,
    ) -> &'a mut TimeseriesContainer {
        self.run_pass_at(container, now_ms);
        container
    }

    /// Run one pass at the clock's current time and report what changed
    pub fn run_pass(&self, container: &mut TimeseriesContainer) -> RollupReport {
        let now_ms = self.clock.now_ms();
        self.run_pass_at(container, now_ms)
    }

    /// Run one pass at an explicit time and report what changed
    pub fn run_pass_at(&self, container: &mut TimeseriesContainer, now_ms: i64) -> RollupReport {
        let config = &self.config;
        let raw_cutoff = now_ms.saturating_sub(config.raw_retention_ms);
        let hourly_cutoff = now_ms.saturating_sub(config.hourly_retention_ms);
        let daily_cutoff = now_ms.saturating_sub(config.daily_retention_ms);

        let store = initialize_store(container).store_mut();
        let raw_records = store.all.len();
        let mut report = RollupReport {
            now_ms,
            ..Default::default()
        };

        // Cascade: each tier reads the live snapshot of the tier below
        report.hourly_buckets = replace_buckets(
            &mut store.aggregates.hourly,
            &store.all,
            config.hourly_resolution_ms,
            config,
            "hourly",
        );

        let hourly: Vec<_> = store.aggregates.hourly.values().cloned().collect();
        report.daily_buckets = replace_buckets(
            &mut store.aggregates.daily,
            &hourly,
            config.daily_resolution_ms,
            config,
            "daily",
        );

        let daily: Vec<_> = store.aggregates.daily.values().cloned().collect();
        report.monthly_buckets = replace_buckets(
            &mut store.aggregates.monthly,
            &daily,
            config.monthly_resolution_ms,
            config,
            "monthly",
        );

        // Eviction, using the cutoffs fixed at the start of the pass
        let before = store.all.len();
        store.all.retain(|r| r.ts >= raw_cutoff);
        report.raw_evicted = before - store.all.len();

        report.hourly_evicted = evict_before(&mut store.aggregates.hourly, hourly_cutoff);
        report.daily_evicted = evict_before(&mut store.aggregates.daily, daily_cutoff);

        self.stats.record_pass(raw_records, &report);

        info!(
            now_ms,
            raw_records,
            buckets_written = report.buckets_written(),
            evicted = report.evicted(),
            hourly = store.aggregates.hourly.len(),
            daily = store.aggregates.daily.len(),
            monthly = store.aggregates.monthly.len(),
            "Rollup pass complete"
        );

        report
    }
}

/// Aggregate `source` and overwrite the matching buckets of `tier`
fn replace_buckets<S: Sample>(
    tier: &mut Tier,
    source: &[S],
    resolution_ms: i64,
    config: &RollupConfig,
    tier_name: &'static str,
) -> usize {
    let buckets = aggregate(source, Some(resolution_ms), Some(&config.policy));
    let written = buckets.len();

    for bucket in buckets {
        tier.insert(bucket.ts, bucket);
    }

    debug!(
        tier = tier_name,
        inputs = source.len(),
        buckets = written,
        resolution_ms,
        "Tier recomputed"
    );
    written
}

/// Drop every bucket labelled before `cutoff`, returning how many went
fn evict_before(tier: &mut Tier, cutoff: i64) -> usize {
    let kept = tier.split_off(&cutoff);
    let evicted = tier.len();
    *tier = kept;
    evicted
}

/// Run one pass over `container` with default configuration and the system clock
///
/// Returns the same container, mutated in place.
pub fn process(container: &mut TimeseriesContainer) -> &mut TimeseriesContainer {
    RollupOrchestrator::default().process(container)
}
