//! Operator semantics for `fieldValue` conditions.
//!
//! Absent values (no such path) fail every operator except `notEquals`. An explicit
//! JSON `null` is a present value and compares like any other. Numbers compare by
//! value regardless of integer or float representation; ordering operators also coerce
//! numeric strings. Mixed, non-coercible operands never satisfy an ordering.

use std::cmp::Ordering;

use form_config::Operator;
use serde_json::Value;

use crate::{EvalError, regex_cache::RegexCache};

/// Apply `op` to `actual` (the value at the field path, if any) and `expected`.
pub fn apply(
    op: Operator,
    actual: Option<&Value>,
    expected: &Value,
    regexes: &RegexCache,
) -> Result<bool, EvalError> {
    let Some(actual) = actual else {
        return Ok(op.passes_when_absent());
    };
    Ok(match op {
        Operator::Equals => loose_eq(actual, expected),
        Operator::NotEquals => !loose_eq(actual, expected),
        Operator::Greater => order(actual, expected) == Some(Ordering::Greater),
        Operator::Less => order(actual, expected) == Some(Ordering::Less),
        Operator::GreaterOrEqual => matches!(
            order(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::LessOrEqual => {
            matches!(order(actual, expected), Some(Ordering::Less | Ordering::Equal))
        }
        Operator::Contains => contains(actual, expected),
        Operator::StartsWith => match (actual, expected) {
            (Value::String(a), Value::String(e)) => a.starts_with(e.as_str()),
            _ => false,
        },
        Operator::EndsWith => match (actual, expected) {
            (Value::String(a), Value::String(e)) => a.ends_with(e.as_str()),
            _ => false,
        },
        Operator::Matches => {
            let Value::String(pattern) = expected else {
                return Err(EvalError::InvalidPattern {
                    pattern: expected.to_string(),
                    message: "pattern must be a string".to_string(),
                });
            };
            let re = regexes
                .get_or_compile(pattern)
                .map_err(|e| EvalError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
            match actual {
                Value::String(s) => re.is_match(s),
                Value::Number(n) => re.is_match(&n.to_string()),
                _ => false,
            }
        }
    })
}

/// Equality with numeric normalisation; `1` equals `1.0`.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| loose_eq(x, y))
        }
        _ => a == b,
    }
}

/// Ordering used by the comparison operators, if the operands are comparable.
fn order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => match (x.trim().parse::<f64>(), y.trim().parse::<f64>()) {
            (Ok(nx), Ok(ny)) => nx.partial_cmp(&ny),
            _ => Some(x.cmp(y)),
        },
        _ => as_number(a)?.partial_cmp(&as_number(b)?),
    }
}

/// Numeric view of a value: numbers and numeric strings.
fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Substring test for strings, membership for arrays.
fn contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::String(h), Value::String(n)) => h.contains(n.as_str()),
        (Value::Array(items), n) => items.iter().any(|i| loose_eq(i, n)),
        _ => false,
    }
}
