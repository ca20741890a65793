//! Per-field aggregation policy
//!
//! A policy maps field names to the rule used when folding that field into
//! a window. Fields without an entry get a type-driven default: numbers are
//! averaged, strings become distributions, lists are unioned and nested
//! mappings are merged.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Aggregation rule for a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldPolicy {
    /// Running sum
    Sum,
    /// Running minimum
    Min,
    /// Running maximum
    Max,
    /// Running average (the default for numbers)
    Avg,
    /// Growing list of distinct values
    Unique,
    /// Frequency distribution of values
    Dist,
    /// Reserved; the field is left out of the output
    Count,
}

impl FieldPolicy {
    /// Policy name as used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldPolicy::Sum => "sum",
            FieldPolicy::Min => "min",
            FieldPolicy::Max => "max",
            FieldPolicy::Avg => "avg",
            FieldPolicy::Unique => "unique",
            FieldPolicy::Dist => "dist",
            FieldPolicy::Count => "count",
        }
    }
}

impl fmt::Display for FieldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(FieldPolicy::Sum),
            "min" => Ok(FieldPolicy::Min),
            "max" => Ok(FieldPolicy::Max),
            "avg" | "average" | "mean" => Ok(FieldPolicy::Avg),
            "unique" => Ok(FieldPolicy::Unique),
            "dist" | "distribution" => Ok(FieldPolicy::Dist),
            "count" => Ok(FieldPolicy::Count),
            other => Err(Error::Configuration(format!(
                "unknown aggregation policy '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for FieldPolicy {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldPolicy> for String {
    fn from(policy: FieldPolicy) -> Self {
        policy.as_str().to_string()
    }
}

/// Field name -> aggregation rule
///
/// Serializes as a plain mapping, e.g. in TOML:
///
/// ```toml
/// [policy]
/// requests = "sum"
/// p99_ms = "max"
/// region = "unique"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregationPolicy {
    fields: HashMap<String, FieldPolicy>,
}

impl AggregationPolicy {
    /// Create an empty policy (type-driven defaults everywhere)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style rule insertion
    pub fn with(mut self, field: impl Into<String>, policy: FieldPolicy) -> Self {
        self.fields.insert(field.into(), policy);
        self
    }

    /// Insert or replace the rule for a field
    pub fn set(&mut self, field: impl Into<String>, policy: FieldPolicy) {
        self.fields.insert(field.into(), policy);
    }

    /// Rule for a field, if one was configured
    pub fn get(&self, field: &str) -> Option<FieldPolicy> {
        self.fields.get(field).copied()
    }

    /// Number of configured fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if no field has an explicit rule
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldPolicy)> for AggregationPolicy {
    fn from_iter<I: IntoIterator<Item = (K, FieldPolicy)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, p)| (k.into(), p)).collect(),
        }
    }
}
