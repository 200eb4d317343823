//! Tolerant deserializers for backend payloads.
//!
//! The budget backend is loose about numeric fields: amounts arrive as
//! numbers, numeric strings, or `null` depending on the endpoint. A missing or
//! unreadable value means "not set" and decodes to zero instead of failing the
//! whole response.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::category::BucketGroup;

fn value_to_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Number, numeric string, or null. Anything else decodes to `0.0`.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(value_to_f64).filter(|v| v.is_finite()).unwrap_or(0.0))
}

/// A list of lenient numbers; a missing or non-array value is an empty list.
pub fn lenient_f64_vec<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        Some(Value::Array(items)) => Ok(items
            .iter()
            .map(value_to_f64)
            .map(|v| if v.is_finite() { v } else { 0.0 })
            .collect()),
        _ => Ok(Vec::new()),
    }
}

/// Index fields that may be negative, fractional or missing in bad payloads.
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .unwrap_or(-1),
        Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(-1),
        _ => -1,
    })
}

/// Optional non-negative index (e.g. `current_month_index`).
pub fn lenient_index<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().map(|v| v as usize),
        Some(Value::String(s)) => s.trim().parse::<usize>().ok(),
        _ => None,
    })
}

/// Unknown, empty or null group strings decode to `None`.
pub fn lenient_group<'de, D>(deserializer: D) -> Result<Option<BucketGroup>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => BucketGroup::parse(&s),
        _ => None,
    })
}

/// Null strings decode to empty.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Optional label; anything but a non-empty string is `None`.
pub fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    })
}
