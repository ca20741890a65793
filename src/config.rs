//! Configuration management for rollups
//!
//! Provides TOML configuration support, environment variable overrides, and
//! defaults matching the standard hourly / daily / monthly hierarchy:
//!
//! | tier    | resolution        | retention |
//! |---------|-------------------|-----------|
//! | raw     | -                 | 24 hours  |
//! | hourly  | 1 hour            | 48 hours  |
//! | daily   | 24 hours          | 32 days   |
//! | monthly | 30.43685 days     | forever   |
//!
//! # Example
//!
//! ```toml
//! raw_retention_ms = 86400000
//! process_interval_ms = 30000
//!
//! [policy]
//! requests = "sum"
//! region = "unique"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aggregation::AggregationPolicy;
use crate::error::{Error, Result};

const HOUR_MS: i64 = 60 * 60 * 1000;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Average Gregorian month, `floor(30.43685 days)` in milliseconds
pub const MONTH_MS: i64 = 2_629_743_840;

/// Rollup configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RollupConfig {
    /// How long raw records stay in the retained window
    #[serde(default = "default_raw_retention_ms")]
    pub raw_retention_ms: i64,

    /// How long hourly buckets are kept
    #[serde(default = "default_hourly_retention_ms")]
    pub hourly_retention_ms: i64,

    /// How long daily buckets are kept
    #[serde(default = "default_daily_retention_ms")]
    pub daily_retention_ms: i64,

    /// Resolution of the hourly tier
    #[serde(default = "default_hourly_resolution_ms")]
    pub hourly_resolution_ms: i64,

    /// Resolution of the daily tier
    #[serde(default = "default_daily_resolution_ms")]
    pub daily_resolution_ms: i64,

    /// Resolution of the monthly tier
    #[serde(default = "default_monthly_resolution_ms")]
    pub monthly_resolution_ms: i64,

    /// Interval between background rollup passes
    #[serde(default = "default_process_interval_ms")]
    pub process_interval_ms: u64,

    /// Aggregation rules applied at every tier
    #[serde(default)]
    pub policy: AggregationPolicy,
}

// Default value functions
fn default_raw_retention_ms() -> i64 { DAY_MS }
fn default_hourly_retention_ms() -> i64 { 2 * DAY_MS }
fn default_daily_retention_ms() -> i64 { 32 * DAY_MS }
fn default_hourly_resolution_ms() -> i64 { HOUR_MS }
fn default_daily_resolution_ms() -> i64 { DAY_MS }
fn default_monthly_resolution_ms() -> i64 { MONTH_MS }
fn default_process_interval_ms() -> u64 { 60_000 }

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            raw_retention_ms: default_raw_retention_ms(),
            hourly_retention_ms: default_hourly_retention_ms(),
            daily_retention_ms: default_daily_retention_ms(),
            hourly_resolution_ms: default_hourly_resolution_ms(),
            daily_resolution_ms: default_daily_resolution_ms(),
            monthly_resolution_ms: default_monthly_resolution_ms(),
            process_interval_ms: default_process_interval_ms(),
            policy: AggregationPolicy::default(),
        }
    }
}

impl RollupConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load configuration from a file, then apply environment overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    ///
    /// Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse("ROLLUP_RAW_RETENTION_MS") {
            self.raw_retention_ms = v;
        }
        if let Some(v) = env_parse("ROLLUP_HOURLY_RETENTION_MS") {
            self.hourly_retention_ms = v;
        }
        if let Some(v) = env_parse("ROLLUP_DAILY_RETENTION_MS") {
            self.daily_retention_ms = v;
        }
        if let Some(v) = env_parse("ROLLUP_PROCESS_INTERVAL_MS") {
            self.process_interval_ms = v;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("raw_retention_ms", self.raw_retention_ms),
            ("hourly_retention_ms", self.hourly_retention_ms),
            ("daily_retention_ms", self.daily_retention_ms),
            ("hourly_resolution_ms", self.hourly_resolution_ms),
            ("daily_resolution_ms", self.daily_resolution_ms),
            ("monthly_resolution_ms", self.monthly_resolution_ms),
        ];
        for (name, value) in positive {
            if value <= 0 {
                return Err(Error::Configuration(format!("{} must be > 0", name)));
            }
        }

        if self.process_interval_ms == 0 {
            return Err(Error::Configuration(
                "process_interval_ms must be > 0".to_string(),
            ));
        }

        // Each tier is derived from the one below, so it must outlive it
        if self.hourly_retention_ms < self.raw_retention_ms {
            return Err(Error::Configuration(
                "hourly_retention_ms cannot be shorter than raw_retention_ms".to_string(),
            ));
        }
        if self.daily_retention_ms < self.hourly_retention_ms {
            return Err(Error::Configuration(
                "daily_retention_ms cannot be shorter than hourly_retention_ms".to_string(),
            ));
        }

        Ok(())
    }

    /// Interval between background passes
    pub fn process_interval(&self) -> Duration {
        Duration::from_millis(self.process_interval_ms)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
