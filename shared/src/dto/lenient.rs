//! Tolerant field decoders for backend records.
//!
//! Historical payloads send numbers as strings, ids as numbers and blank
//! strings where a value is missing. These helpers accept all of those and
//! map anything unusable to `None` instead of failing the whole list.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Field-name variants a backend object may carry. Each entry is the
/// canonical key followed by the older names, most preferred first.
pub trait FieldVariants {
    const VARIANTS: &'static [(&'static str, &'static [&'static str])];
}

/// Folds every variant of a field into its canonical key. The first variant
/// holding a usable value wins; null and blank strings never do. The other
/// variants are dropped so a payload carrying both `_id` and `id` decodes.
pub fn canonicalize(value: Value, variants: &[(&str, &[&str])]) -> Value {
    let Value::Object(mut map) = value else {
        return value;
    };
    for (canonical, older) in variants {
        let mut chosen: Option<Value> = None;
        for key in std::iter::once(canonical).chain(older.iter()) {
            if let Some(found) = map.remove(*key) {
                if chosen.as_ref().map_or(true, is_missing) {
                    chosen = Some(found);
                }
            }
        }
        if let Some(found) = chosen {
            map.insert((*canonical).to_string(), found);
        }
    }
    Value::Object(map)
}

/// Decodes one backend object after folding its field-name variants.
pub fn decode_record<T>(value: Value) -> serde_json::Result<T>
where
    T: DeserializeOwned + FieldVariants,
{
    serde_json::from_value(canonicalize(value, T::VARIANTS))
}

fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_string(&value).unwrap_or_default())
}

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string))
}

pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
        _ => None,
    })
}

pub fn opt_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

pub fn opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// First parseable timestamp among field-name variants, in the order given.
pub fn first_timestamp(candidates: &[Option<&str>]) -> Option<NaiveDateTime> {
    candidates
        .iter()
        .flatten()
        .find_map(|raw| parse_timestamp(raw))
}
