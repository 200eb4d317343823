/// Serde helpers for HTML form deserialization.
///
/// HTML `<select>` elements with an empty `<option value="">` send an empty
/// string for the field, which `serde_urlencoded` cannot parse as a number.
/// These helpers treat empty strings as `None`.
use serde::{Deserialize, Deserializer};

pub fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v.parse::<i64>().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Money inputs: blank means zero, anything else must be a non-negative
/// number.
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(0.0),
        Some(v) => match v.replace(',', ".").parse::<f64>() {
            Ok(n) if n.is_finite() && n >= 0.0 => Ok(n),
            _ => Err(serde::de::Error::custom(format!("invalid amount: {}", v))),
        },
    }
}

/// HTML checkboxes send their value only when checked.
pub fn deserialize_checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(matches!(s.as_deref(), Some("on" | "true" | "1" | "yes")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Form {
        #[serde(default, deserialize_with = "deserialize_optional_i64")]
        parent_id: Option<i64>,
        #[serde(default, deserialize_with = "deserialize_amount")]
        limit_a: f64,
        #[serde(default, deserialize_with = "deserialize_checkbox")]
        rollover: bool,
    }

    #[test]
    fn test_empty_fields() {
        let form: Form = serde_urlencoded::from_str("parent_id=&limit_a=").unwrap();
        assert_eq!(form.parent_id, None);
        assert_eq!(form.limit_a, 0.0);
        assert!(!form.rollover);
    }

    #[test]
    fn test_filled_fields() {
        let form: Form =
            serde_urlencoded::from_str("parent_id=4&limit_a=12%2C50&rollover=on").unwrap();
        assert_eq!(form.parent_id, Some(4));
        assert_eq!(form.limit_a, 12.5);
        assert!(form.rollover);
    }

    #[test]
    fn test_negative_amount_rejected() {
        assert!(serde_urlencoded::from_str::<Form>("limit_a=-5").is_err());
    }
}
