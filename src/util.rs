//! Small stateless helpers used around the aggregation engine
//!
//! - [`coerce_fields`]: restore native types on string-encoded records
//!   (form posts, query strings, key/value stores that only hold strings)
//! - [`last_n`]: tail selection for "most recent N" dashboards
//! - [`map_values`]: flatten a tier map into its values

use std::collections::BTreeMap;

use crate::types::FieldValue;

/// Restore native types on a flat, string-encoded field mapping
///
/// Only `Text` values are touched:
///
/// | input          | result            |
/// |----------------|-------------------|
/// | `"undefined"`  | field removed     |
/// | `"true"`       | `Bool(true)`      |
/// | `"false"`      | `Bool(false)`     |
/// | `"null"`       | `Null`            |
/// | `"NaN"`        | `Number(NaN)`     |
/// | numeric literal| `Number(..)`      |
///
/// Numeric literals use a permissive decimal grammar: surrounding
/// whitespace is ignored, `Infinity` and `0x`/`0o`/`0b` prefixes are
/// accepted, and a non-empty whitespace-only string reads as `0`. The empty
/// string stays a string.
///
/// # Example
///
/// ```rust
/// use std::collections::BTreeMap;
/// use kuba_rollup::types::FieldValue;
/// use kuba_rollup::util::coerce_fields;
///
/// let mut fields = BTreeMap::new();
/// fields.insert("count".to_string(), FieldValue::from("42"));
/// fields.insert("ok".to_string(), FieldValue::from("true"));
/// fields.insert("gone".to_string(), FieldValue::from("undefined"));
///
/// coerce_fields(&mut fields);
///
/// assert_eq!(fields["count"], FieldValue::Number(42.0));
/// assert_eq!(fields["ok"], FieldValue::Bool(true));
/// assert!(!fields.contains_key("gone"));
/// ```
pub fn coerce_fields(fields: &mut BTreeMap<String, FieldValue>) {
    fields.retain(|_, value| !matches!(value, FieldValue::Text(s) if s == "undefined"));

    for value in fields.values_mut() {
        let FieldValue::Text(text) = value else {
            continue;
        };

        let restored = match text.as_str() {
            "true" => FieldValue::Bool(true),
            "false" => FieldValue::Bool(false),
            "null" => FieldValue::Null,
            "NaN" => FieldValue::Number(f64::NAN),
            other => match parse_number_literal(other) {
                Some(n) => FieldValue::Number(n),
                None => continue,
            },
        };

        *value = restored;
    }
}

/// Parse a permissive numeric literal
///
/// Accepts decimal and exponent forms, `Infinity`, and `0x`/`0o`/`0b`
/// integers. Returns `None` for anything else, including the empty
/// string.
pub fn parse_number_literal(input: &str) -> Option<f64> {
    if input.is_empty() {
        return None;
    }

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    match trimmed {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {},
    }

    for (prefixes, radix) in [(["0x", "0X"], 16), (["0o", "0O"], 8), (["0b", "0B"], 2)] {
        if let Some(digits) = prefixes.iter().find_map(|p| trimmed.strip_prefix(p)) {
            return parse_radix_digits(digits, radix);
        }
    }

    // f64::from_str also accepts "inf" and "nan"; reject them here
    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return None;
    }

    trimmed.parse::<f64>().ok()
}

fn parse_radix_digits(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0.0f64, |acc, c| {
        c.to_digit(radix)
            .map(|d| acc * f64::from(radix) + f64::from(d))
    })
}

/// Return the last `n` elements of a slice, or the whole slice if shorter
///
/// ```rust
/// use kuba_rollup::util::last_n;
///
/// assert_eq!(last_n(2, &[1, 2, 3]), &[2, 3]);
/// assert_eq!(last_n(5, &[1, 2, 3]), &[1, 2, 3]);
/// ```
pub fn last_n<T>(n: usize, items: &[T]) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

/// Collect the values of a map in its enumeration order
///
/// For a tier map (`BTreeMap<i64, _>`) this yields buckets in ascending
/// timestamp order.
pub fn map_values<'a, K, V, I>(map: I) -> Vec<V>
where
    K: 'a,
    V: Clone + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    map.into_iter().map(|(_, v)| v.clone()).collect()
}
