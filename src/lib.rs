//! Kuba Rollup - windowed aggregation and hierarchical timeseries rollups
//!
//! This library provides:
//! - Time-window aggregation of heterogeneous records under per-field policies
//! - Hourly, daily and monthly rollup tiers derived from each other
//! - Retention-driven eviction with a permanent monthly archive
//! - A background service that runs rollup passes on a schedule

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

/// Configuration management with TOML support
pub mod config;

/// String-to-value coercion and small collection helpers
pub mod util;

/// Windowed aggregation engine
/// Folds records into per-window aggregate records using per-field accumulators
pub mod aggregation;

/// Hierarchical rollups with retention
/// Maintains hourly, daily and monthly tiers inside a caller-owned container
pub mod rollup;

/// Background services for scheduled rollup passes
/// Provides the service trait, status reporting and graceful shutdown
pub mod services;

// Re-export main types
pub use aggregation::{aggregate, AggregationPolicy, FieldPolicy};
pub use config::RollupConfig;
pub use error::{Error, Result};
pub use rollup::{process, RollupOrchestrator, SharedTimeseries, TimeseriesContainer};
pub use types::{AggregateRecord, FieldValue, Record};
