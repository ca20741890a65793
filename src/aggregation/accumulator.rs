//! Per-field accumulators
//!
//! Each field of a window gets one accumulator, chosen from the field's
//! policy and the first value seen for it in that window. Later values that
//! don't fit the chosen kind are skipped.

use std::collections::BTreeMap;

use crate::types::{number_text, FieldValue};

use super::policy::FieldPolicy;

/// Numeric operation for a running [`FieldAccumulator::Number`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    /// Running sum
    Sum,
    /// Running minimum
    Min,
    /// Running maximum
    Max,
}

/// Accumulated state for one field within one window
#[derive(Debug, Clone, PartialEq)]
pub enum FieldAccumulator {
    /// Running sum, min or max
    Number {
        /// Operation applied on every fold
        op: NumericOp,
        /// Current value
        value: f64,
    },

    /// Running average
    Average {
        /// Current mean
        mean: f64,
        /// Values folded so far
        count: u64,
    },

    /// Frequency distribution: label -> count
    Distribution(BTreeMap<String, f64>),

    /// Distinct values in first-seen order
    UniqueSet(Vec<FieldValue>),
}

/// How a single value folds, as decided by policy and value type
#[derive(Debug)]
enum Fold<'a> {
    /// Append to a distinct set (scalars push, lists extend)
    Unique(&'a FieldValue),
    /// Union a list into a distinct set
    Union(&'a [FieldValue]),
    /// Count one occurrence of a label
    Tally(String),
    /// Sum a distribution into the accumulator
    Merge(&'a BTreeMap<String, f64>),
    /// Numeric fold
    Numeric(Option<NumericOp>, f64),
}

/// Choose the folding rule; `None` means the value contributes nothing
fn classify(policy: Option<FieldPolicy>, value: &FieldValue) -> Option<Fold<'_>> {
    match (policy, value) {
        (Some(FieldPolicy::Count), _) => None,
        (Some(FieldPolicy::Unique), FieldValue::Distribution(_)) => None,
        (Some(FieldPolicy::Unique), v) => Some(Fold::Unique(v)),
        (_, FieldValue::List(items)) => Some(Fold::Union(items)),
        (_, FieldValue::Text(s)) => Some(Fold::Tally(s.clone())),
        (_, FieldValue::Distribution(d)) => Some(Fold::Merge(d)),
        (Some(FieldPolicy::Dist), v) => Some(Fold::Tally(v.to_string())),
        (Some(FieldPolicy::Sum), FieldValue::Number(n)) => Some(Fold::Numeric(Some(NumericOp::Sum), *n)),
        (Some(FieldPolicy::Min), FieldValue::Number(n)) => Some(Fold::Numeric(Some(NumericOp::Min), *n)),
        (Some(FieldPolicy::Max), FieldValue::Number(n)) => Some(Fold::Numeric(Some(NumericOp::Max), *n)),
        (_, FieldValue::Number(n)) => Some(Fold::Numeric(None, *n)),
        _ => None,
    }
}

impl FieldAccumulator {
    /// Start an accumulator from the first value of a field
    ///
    /// Returns `None` when the value has no rule under the policy.
    pub fn start(policy: Option<FieldPolicy>, value: &FieldValue) -> Option<Self> {
        let fold = classify(policy, value)?;

        let mut acc = match fold {
            Fold::Unique(_) | Fold::Union(_) => FieldAccumulator::UniqueSet(Vec::new()),
            Fold::Tally(_) | Fold::Merge(_) => FieldAccumulator::Distribution(BTreeMap::new()),
            Fold::Numeric(Some(op), n) => FieldAccumulator::Number {
                op,
                value: round_if_shorter(n),
            },
            Fold::Numeric(None, n) => FieldAccumulator::Average { mean: n, count: 1 },
        };

        if matches!(acc, FieldAccumulator::UniqueSet(_) | FieldAccumulator::Distribution(_)) {
            acc.apply(fold);
        }
        Some(acc)
    }

    /// Fold another value in
    ///
    /// Returns `false` if the value was skipped, either because it has no
    /// rule or because it doesn't match this accumulator's kind.
    pub fn fold(&mut self, policy: Option<FieldPolicy>, value: &FieldValue) -> bool {
        match classify(policy, value) {
            Some(fold) => self.apply(fold),
            None => false,
        }
    }

    fn apply(&mut self, fold: Fold<'_>) -> bool {
        match (self, fold) {
            (FieldAccumulator::UniqueSet(items), Fold::Unique(FieldValue::List(values))) => {
                items.extend(values.iter().cloned());
                *items = distinct(std::mem::take(items));
                true
            },
            (FieldAccumulator::UniqueSet(items), Fold::Union(values)) => {
                items.extend(values.iter().cloned());
                *items = distinct(std::mem::take(items));
                true
            },
            (FieldAccumulator::UniqueSet(items), Fold::Unique(v)) => {
                items.push(v.clone());
                *items = distinct(std::mem::take(items));
                true
            },
            (FieldAccumulator::Distribution(dist), Fold::Tally(label)) => {
                *dist.entry(label).or_insert(0.0) += 1.0;
                true
            },
            (FieldAccumulator::Distribution(dist), Fold::Merge(other)) => {
                for (label, count) in other {
                    *dist.entry(label.clone()).or_insert(0.0) += count;
                }
                true
            },
            (FieldAccumulator::Number { op, value }, Fold::Numeric(Some(fold_op), n))
                if *op == fold_op =>
            {
                let next = match fold_op {
                    NumericOp::Sum => *value + n,
                    NumericOp::Min => value.min(n),
                    NumericOp::Max => value.max(n),
                };
                *value = round_if_shorter(next);
                true
            },
            (FieldAccumulator::Average { mean, count }, Fold::Numeric(None, n)) => {
                let c = *count as f64;
                *mean = (*mean * c + n) / (c + 1.0);
                *count += 1;
                true
            },
            _ => false,
        }
    }

    /// Current output value of the accumulator
    pub fn value(&self) -> FieldValue {
        match self {
            FieldAccumulator::Number { value, .. } => FieldValue::Number(*value),
            FieldAccumulator::Average { mean, .. } => FieldValue::Number(round_if_shorter(*mean)),
            FieldAccumulator::Distribution(dist) => FieldValue::Distribution(dist.clone()),
            FieldAccumulator::UniqueSet(items) => FieldValue::List(items.clone()),
        }
    }
}

/// Round to two decimals, but only when that makes the number shorter
///
/// `15` stays `15` (and is not widened to `15.00`), while
/// `0.30000000000000004` becomes `0.3` and `2.3456` becomes `2.35`.
/// Exact halfway values round away from zero, so `1.125` becomes `1.13`.
pub fn round_if_shorter(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let fixed = two_decimals(value);
    if fixed.len() < number_text(value).len() {
        fixed.parse().unwrap_or(value)
    } else {
        value
    }
}

/// Fixed two-decimal text with halfway cases rounded away from zero
fn two_decimals(value: f64) -> String {
    // A binary float sits exactly halfway between two cents only when it is
    // an odd multiple of 1/8 (x.125, x.375, x.625, x.875)
    let eighths = value * 8.0;
    if eighths.fract() != 0.0 || eighths.rem_euclid(2.0) != 1.0 {
        return format!("{:.2}", value);
    }

    // Exact here, e.g. "-1.125". The cent digit is 2 or 7, so bump it in place
    let mut digits = format!("{:.3}", value).into_bytes();
    digits.pop();
    if let Some(cent) = digits.last_mut() {
        *cent += 1;
    }
    String::from_utf8(digits).unwrap_or_else(|_| format!("{:.2}", value))
}

/// Remove duplicates, keeping the first occurrence of each value in order
///
/// ```rust
/// use kuba_rollup::aggregation::distinct;
///
/// assert_eq!(distinct(vec![3, 1, 3, 2, 1]), vec![3, 1, 2]);
/// ```
pub fn distinct<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> FieldValue {
        FieldValue::Number(n)
    }

    fn fold_all(policy: Option<FieldPolicy>, values: &[FieldValue]) -> Option<FieldValue> {
        let (first, rest) = values.split_first()?;
        let mut acc = FieldAccumulator::start(policy, first)?;
        for v in rest {
            acc.fold(policy, v);
        }
        Some(acc.value())
    }

    #[test]
    fn test_round_if_shorter() {
        assert_eq!(round_if_shorter(15.0), 15.0);
        assert_eq!(round_if_shorter(0.1 + 0.2), 0.3);
        assert_eq!(round_if_shorter(2.3456), 2.35);
        assert_eq!(round_if_shorter(1.5), 1.5);
        assert_eq!(round_if_shorter(1.25), 1.25);
        assert_eq!(round_if_shorter(1.0 / 3.0), 0.33);
        assert!(round_if_shorter(f64::NAN).is_nan());
    }

    #[test]
    fn test_round_halfway_away_from_zero() {
        assert_eq!(round_if_shorter(1.125), 1.13);
        assert_eq!(round_if_shorter(-1.125), -1.13);
        assert_eq!(round_if_shorter(0.125), 0.13);
        assert_eq!(round_if_shorter(0.375), 0.38);
        assert_eq!(round_if_shorter(99.875), 99.88);
        assert_eq!(round_if_shorter(-0.625), -0.63);

        assert_eq!(two_decimals(9.875), "9.88");
        assert_eq!(two_decimals(-2.5), "-2.50");
        assert_eq!(two_decimals(2.3456), "2.35");
    }

    #[test]
    fn test_halfway_sum_and_average() {
        let avg = fold_all(None, &[num(1.0), num(1.25)]);
        assert_eq!(avg, Some(num(1.13)));

        let sum = fold_all(Some(FieldPolicy::Sum), &[num(1.0), num(0.125)]);
        assert_eq!(sum, Some(num(1.13)));
    }

    #[test]
    fn test_average_default() {
        let out = fold_all(None, &[num(10.0), num(20.0), num(30.0)]);
        assert_eq!(out, Some(num(20.0)));
    }

    #[test]
    fn test_average_rounds_output() {
        let out = fold_all(None, &[num(1.0), num(1.0), num(2.0)]);
        assert_eq!(out, Some(num(1.33)));
    }

    #[test]
    fn test_sum_min_max() {
        let values = [num(4.0), num(-2.0), num(7.5)];
        assert_eq!(fold_all(Some(FieldPolicy::Sum), &values), Some(num(9.5)));
        assert_eq!(fold_all(Some(FieldPolicy::Min), &values), Some(num(-2.0)));
        assert_eq!(fold_all(Some(FieldPolicy::Max), &values), Some(num(7.5)));
    }

    #[test]
    fn test_min_seeded_by_first_value() {
        // A zero-initialised accumulator would wrongly report 0 here
        let out = fold_all(Some(FieldPolicy::Min), &[num(5.0), num(9.0)]);
        assert_eq!(out, Some(num(5.0)));
    }

    #[test]
    fn test_count_policy_is_noop() {
        assert!(FieldAccumulator::start(Some(FieldPolicy::Count), &num(1.0)).is_none());
    }

    #[test]
    fn test_unique_seeds_empty_set() {
        let out = fold_all(
            Some(FieldPolicy::Unique),
            &["a".into(), "b".into(), "a".into(), num(1.0)],
        );
        assert_eq!(
            out,
            Some(FieldValue::List(vec!["a".into(), "b".into(), num(1.0)]))
        );
    }

    #[test]
    fn test_unique_extends_with_lists() {
        let out = fold_all(
            Some(FieldPolicy::Unique),
            &[
                FieldValue::List(vec!["x".into(), "y".into()]),
                "y".into(),
                FieldValue::List(vec!["z".into(), "x".into()]),
            ],
        );
        assert_eq!(
            out,
            Some(FieldValue::List(vec!["x".into(), "y".into(), "z".into()]))
        );
    }

    #[test]
    fn test_list_union_without_policy() {
        let out = fold_all(
            None,
            &[
                FieldValue::List(vec![num(1.0), num(2.0)]),
                FieldValue::List(vec![num(2.0), num(3.0)]),
            ],
        );
        assert_eq!(
            out,
            Some(FieldValue::List(vec![num(1.0), num(2.0), num(3.0)]))
        );
    }

    #[test]
    fn test_strings_become_distribution() {
        let out = fold_all(None, &["a".into(), "a".into(), "b".into()]).unwrap();
        let dist = out.as_distribution().unwrap();
        assert_eq!(dist["a"], 2.0);
        assert_eq!(dist["b"], 1.0);
    }

    #[test]
    fn test_dist_policy_stringifies_numbers() {
        let out = fold_all(Some(FieldPolicy::Dist), &[num(200.0), num(500.0), num(200.0)]).unwrap();
        let dist = out.as_distribution().unwrap();
        assert_eq!(dist["200"], 2.0);
        assert_eq!(dist["500"], 1.0);
    }

    #[test]
    fn test_distribution_merge() {
        let a: BTreeMap<String, f64> = [("x".to_string(), 2.0)].into_iter().collect();
        let b: BTreeMap<String, f64> =
            [("x".to_string(), 1.0), ("y".to_string(), 4.0)].into_iter().collect();

        let out = fold_all(None, &[a.into(), b.into(), "y".into()]).unwrap();
        let dist = out.as_distribution().unwrap();
        assert_eq!(dist["x"], 3.0);
        assert_eq!(dist["y"], 5.0);
    }

    #[test]
    fn test_mismatched_value_is_skipped() {
        let mut acc = FieldAccumulator::start(None, &num(10.0)).unwrap();
        assert!(!acc.fold(None, &"text".into()));
        assert!(acc.fold(None, &num(20.0)));
        assert_eq!(acc.value(), num(15.0));
    }

    #[test]
    fn test_booleans_and_null_are_dropped() {
        assert!(FieldAccumulator::start(None, &FieldValue::Bool(true)).is_none());
        assert!(FieldAccumulator::start(None, &FieldValue::Null).is_none());
        assert!(FieldAccumulator::start(Some(FieldPolicy::Sum), &FieldValue::Null).is_none());
    }

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        assert_eq!(distinct(vec!["b", "a", "b", "c", "a"]), vec!["b", "a", "c"]);
        assert!(distinct(Vec::<i32>::new()).is_empty());
    }
}
