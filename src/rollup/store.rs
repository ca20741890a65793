//! Timeseries store shape
//!
//! ```text
//! container
//! └── timeseries
//!     ├── all                  raw records, retained 24h
//!     └── aggregates
//!         ├── hourly   ts -> AggregateRecord, retained 48h
//!         ├── daily    ts -> AggregateRecord, retained 32d
//!         └── monthly  ts -> AggregateRecord, kept forever
//! ```
//!
//! The container belongs to the caller and may carry any other fields; they
//! round-trip untouched. Any missing (or null) part of the `timeseries`
//! shape is created empty, either on deserialization or by
//! [`initialize_store`].

use std::collections::BTreeMap;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::types::{AggregateRecord, Record};

/// One aggregate tier: bucket label -> aggregate record
pub type Tier = BTreeMap<i64, AggregateRecord>;

/// Deserialize `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Tier map key: a bucket label written either as a JSON string or a number
///
/// JSON object keys are always strings, and once a container with extra
/// caller fields is buffered, integer keys can no longer be recovered by the
/// plain `i64` impl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct TierKey(i64);

impl<'de> Deserialize<'de> for TierKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct KeyVisitor;

        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = i64;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("an integer bucket label")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<i64, E> {
                Ok(v)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<i64, E> {
                i64::try_from(v).map_err(|_| E::custom(format!("bucket label {} out of range", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<i64, E> {
                v.parse()
                    .map_err(|_| E::custom(format!("invalid bucket label '{}'", v)))
            }
        }

        deserializer.deserialize_any(KeyVisitor).map(TierKey)
    }
}

fn deserialize_tier<'de, D>(deserializer: D) -> std::result::Result<Tier, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<TierKey, AggregateRecord>> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(|tier| tier.into_iter().map(|(k, v)| (k.0, v)).collect())
        .unwrap_or_default())
}

/// The three aggregate tiers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
    /// Hourly buckets
    #[serde(default, deserialize_with = "deserialize_tier")]
    pub hourly: Tier,

    /// Daily buckets
    #[serde(default, deserialize_with = "deserialize_tier")]
    pub daily: Tier,

    /// Monthly buckets (permanent archive)
    #[serde(default, deserialize_with = "deserialize_tier")]
    pub monthly: Tier,
}

/// Raw retained window plus aggregate tiers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesStore {
    /// Raw records inside the retention window
    #[serde(default, deserialize_with = "null_as_default")]
    pub all: Vec<Record>,

    /// Aggregate tiers
    #[serde(default, deserialize_with = "null_as_default")]
    pub aggregates: Aggregates,
}

impl TimeseriesStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw record to the retained window
    pub fn ingest(&mut self, record: Record) {
        self.all.push(record);
    }

    /// Append many raw records
    pub fn ingest_batch(&mut self, records: impl IntoIterator<Item = Record>) {
        self.all.extend(records);
    }

    /// Total entries across the raw window and all tiers
    pub fn len(&self) -> usize {
        self.all.len()
            + self.aggregates.hourly.len()
            + self.aggregates.daily.len()
            + self.aggregates.monthly.len()
    }

    /// True if the raw window and all tiers are empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Caller-owned object holding an optional `timeseries` store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesContainer {
    /// Rollup state, created on first use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeseries: Option<TimeseriesStore>,

    /// Any other fields the caller keeps alongside the store
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TimeseriesContainer {
    /// Create a container without a store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container around an existing store
    pub fn with_store(store: TimeseriesStore) -> Self {
        Self {
            timeseries: Some(store),
            extra: serde_json::Map::new(),
        }
    }

    /// Mutable access to the store, creating it if missing
    pub fn store_mut(&mut self) -> &mut TimeseriesStore {
        self.timeseries.get_or_insert_with(TimeseriesStore::default)
    }

    /// Shared access to the store, if one exists
    pub fn store(&self) -> Option<&TimeseriesStore> {
        self.timeseries.as_ref()
    }

    /// Parse a container from JSON text
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Guarantee the `timeseries` shape exists, preserving existing parts
///
/// Idempotent; returns the same container it was given.
pub fn initialize_store(container: &mut TimeseriesContainer) -> &mut TimeseriesContainer {
    container.store_mut();
    container
}
