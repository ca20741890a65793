//! Windowed Aggregation Engine
//!
//! Folds an unordered batch of records into one aggregate record per time
//! window, accumulating every field under a per-field policy.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │     Records (any order, any fields) │
//! └─────────────────────────────────────┘
//!                  ↓ sort by ts
//! ┌─────────────────────────────────────┐
//! │  Window state machine               │
//! │  anchor / accumulators / datapoints │
//! └─────────────────────────────────────┘
//!                  ↓ fold each field
//! ┌─────────────────────────────────────┐
//! │  FieldAccumulator                   │
//! │  Number | Average | Distribution |  │
//! │  UniqueSet                          │
//! └─────────────────────────────────────┘
//!                  ↓
//! ┌─────────────────────────────────────┐
//! │  AggregateRecord per window         │
//! │  { ts, _datapoints, ...fields }     │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Field rules
//!
//! | value / policy                        | accumulation                    |
//! |---------------------------------------|---------------------------------|
//! | policy `count`                        | none, field left out            |
//! | policy `unique`                       | distinct values, first-seen order |
//! | list                                  | union, first-seen order         |
//! | string, or policy `dist`              | distribution of values          |
//! | mapping of label -> count             | distribution merge              |
//! | number + `sum` / `min` / `max`        | running sum / min / max         |
//! | number otherwise                      | running average                 |
//! | boolean / null                        | dropped                         |
//!
//! Numeric results are rounded to two decimals only when that shortens
//! their textual form.

pub mod accumulator;
pub mod policy;
pub mod window;

pub use accumulator::{distinct, round_if_shorter, FieldAccumulator, NumericOp};
pub use policy::{AggregationPolicy, FieldPolicy};
pub use window::{aggregate, bucket_label, effective_resolution, DEFAULT_RESOLUTION_MS};
