//! Core data types used throughout the rollup library
//!
//! # Key Types
//!
//! - **`FieldValue`**: A schema-free field value (number, string, list, distribution)
//! - **`Record`**: A raw timestamped measurement with arbitrary fields
//! - **`AggregateRecord`**: One time bucket produced by the aggregator
//! - **`Sample`**: Anything the aggregator can fold (raw or already aggregated)
//!
//! # Example
//!
//! ```rust
//! use kuba_rollup::types::{FieldValue, Record};
//!
//! let record = Record::new(1_000)
//!     .with_field("latency_ms", 42.5)
//!     .with_field("status", "ok");
//!
//! assert_eq!(record.get("status"), Some(&FieldValue::from("ok")));
//!
//! let parsed = Record::from_json(r#"{"ts": 1000, "latency_ms": 42.5, "status": "ok"}"#).unwrap();
//! assert_eq!(parsed, record);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the mandatory timestamp field
pub const TS_FIELD: &str = "ts";

/// Name of the datapoint counter carried by every aggregate record
pub const DATAPOINTS_FIELD: &str = "_datapoints";

/// Largest integer an f64 represents exactly (2^53 - 1)
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

// ============================================================================
// Field Values
// ============================================================================

/// A single field value of a record
///
/// Records are schema-free; a field can hold a number, a string, a list of
/// primitives, or a distribution (a mapping from label to count). Booleans
/// and null exist so that string-encoded inputs can be restored faithfully,
/// but the aggregator has no rule for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum FieldValue {
    /// Explicit null
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (integers are stored as f64)
    Number(f64),
    /// UTF-8 string value
    Text(String),
    /// List of primitive values
    List(Vec<FieldValue>),
    /// Frequency distribution: label -> count
    Distribution(BTreeMap<String, f64>),
}

impl FieldValue {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "string",
            FieldValue::List(_) => "list",
            FieldValue::Distribution(_) => "distribution",
        }
    }

    /// Get the value as f64 if it is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as a string slice if it is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the distribution if the value is one
    pub fn as_distribution(&self) -> Option<&BTreeMap<String, f64>> {
        match self {
            FieldValue::Distribution(d) => Some(d),
            _ => None,
        }
    }

    /// True for null, booleans, numbers and strings
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            FieldValue::Null | FieldValue::Bool(_) | FieldValue::Number(_) | FieldValue::Text(_)
        )
    }
}

/// Render a number in its shortest canonical text form
///
/// Shortest round-trip digits, `-0` as `0`, and exponent notation outside
/// `[1e-6, 1e21)`. Used for rounding decisions and distribution labels so
/// that both stay stable across resolutions.
pub(crate) fn number_text(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let abs = value.abs();
    if !(1e-6..1e21).contains(&abs) {
        let text = format!("{:e}", value);
        return match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => text,
        };
    }

    format!("{}", value)
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", number_text(*n)),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            },
            FieldValue::Distribution(dist) => {
                for (i, (label, count)) in dist.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}={}", label, number_text(*count))?;
                }
                Ok(())
            },
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Number(v as f64)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Number(f64::from(v))
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(v: Vec<FieldValue>) -> Self {
        FieldValue::List(v)
    }
}

impl From<BTreeMap<String, f64>> for FieldValue {
    fn from(v: BTreeMap<String, f64>) -> Self {
        FieldValue::Distribution(v)
    }
}

/// Convert a JSON number, keeping integral values integral on the wire
fn number_to_json(value: f64) -> serde_json::Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        // -0.0 collapses to 0 here
        return serde_json::Value::from(value as i64);
    }
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

impl From<FieldValue> for serde_json::Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Bool(b) => serde_json::Value::Bool(b),
            FieldValue::Number(n) => number_to_json(n),
            FieldValue::Text(s) => serde_json::Value::String(s),
            FieldValue::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            },
            FieldValue::Distribution(dist) => serde_json::Value::Object(
                dist.into_iter()
                    .map(|(label, count)| (label, number_to_json(count)))
                    .collect(),
            ),
        }
    }
}

impl TryFrom<serde_json::Value> for FieldValue {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Array(items) => {
                let items = items
                    .into_iter()
                    .map(|item| -> Result<FieldValue> {
                        let item = FieldValue::try_from(item)?;
                        if item.is_primitive() {
                            Ok(item)
                        } else {
                            Err(Error::InvalidRecord(format!(
                                "list elements must be primitive values, got {}",
                                item.type_name()
                            )))
                        }
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(FieldValue::List(items))
            },
            serde_json::Value::Object(entries) => {
                let dist = entries
                    .into_iter()
                    .map(|(label, count)| match count.as_f64() {
                        Some(n) => Ok((label, n)),
                        None => Err(Error::InvalidRecord(format!(
                            "distribution entry '{}' is not a number",
                            label
                        ))),
                    })
                    .collect::<Result<BTreeMap<_, _>>>()?;
                Ok(FieldValue::Distribution(dist))
            },
            serde_json::Value::Null => Ok(FieldValue::Null),
            serde_json::Value::Bool(b) => Ok(FieldValue::Bool(b)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(FieldValue::Number)
                .ok_or_else(|| Error::InvalidRecord(format!("unrepresentable number {}", n))),
            serde_json::Value::String(s) => Ok(FieldValue::Text(s)),
        }
    }
}

// ============================================================================
// Samples
// ============================================================================

/// Anything the aggregator can fold into a time bucket
///
/// Raw records and aggregate records both qualify, which is what lets the
/// rollup cascade feed one tier's output into the next tier's aggregation.
pub trait Sample {
    /// Timestamp in milliseconds
    fn timestamp(&self) -> i64;

    /// Field values, excluding the timestamp and datapoint counter
    fn fields(&self) -> &BTreeMap<String, FieldValue>;
}

// ============================================================================
// Records
// ============================================================================

/// A raw timestamped record
///
/// Serializes as a flat object: `{"ts": 1000, "cpu": 12.5, "host": "a"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Timestamp in milliseconds since the Unix epoch
    pub ts: i64,

    /// All other fields
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record at the given timestamp
    pub fn new(ts: i64) -> Self {
        Self {
            ts,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Insert or replace a field
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Look up a field
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Restore native types on string-encoded field values
    ///
    /// See [`crate::util::coerce_fields`].
    pub fn coerce(&mut self) -> &mut Self {
        crate::util::coerce_fields(&mut self.fields);
        self
    }

    /// Parse a record from JSON text
    pub fn from_json(input: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(input)?;
        Self::from_json_value(value)
    }

    /// Build a record from a parsed JSON object
    ///
    /// The object must carry an integral `ts`; every other entry becomes a
    /// field.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(mut object) = value else {
            return Err(Error::InvalidRecord(
                "expected a JSON object".to_string(),
            ));
        };

        let ts = object
            .remove(TS_FIELD)
            .ok_or_else(|| Error::InvalidRecord(format!("missing '{}' field", TS_FIELD)))?;
        let ts = parse_timestamp(&ts)?;

        let fields = object
            .into_iter()
            .map(|(name, value)| FieldValue::try_from(value).map(|v| (name, v)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self { ts, fields })
    }

    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn parse_timestamp(value: &serde_json::Value) -> Result<i64> {
    if let Some(ts) = value.as_i64() {
        return Ok(ts);
    }
    match value.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => Ok(f as i64),
        _ => Err(Error::InvalidRecord(format!(
            "'{}' must be an integer timestamp, got {}",
            TS_FIELD, value
        ))),
    }
}

impl Sample for Record {
    fn timestamp(&self) -> i64 {
        self.ts
    }

    fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }
}

// ============================================================================
// Aggregate Records
// ============================================================================

/// One time bucket produced by the aggregator
///
/// Serializes as `{"ts": 0, "_datapoints": 2, "cpu": 15}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    /// Bucket label: start of the window at the aggregation resolution
    pub ts: i64,

    /// Number of input samples folded into this bucket
    #[serde(rename = "_datapoints", default)]
    pub datapoints: u64,

    /// Aggregated field values
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl AggregateRecord {
    /// Create an empty aggregate record
    pub fn new(ts: i64, datapoints: u64) -> Self {
        Self {
            ts,
            datapoints,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Look up a field
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Look up a numeric field
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(FieldValue::as_f64)
    }
}

impl Sample for AggregateRecord {
    fn timestamp(&self) -> i64 {
        self.ts
    }

    fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }
}
