//! Casting of incoming JSON and query-string values to the stored representation.

use crate::error::ValidationErrors;
use crate::schema::book::filter_kind;
use crate::schema::types::{FieldKind, FieldRule, Schema};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Number, Value};

/// Stored timestamp layout. Fixed width and UTC, so lexical order is chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC) and `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Whole numbers become JSON integers so `"10"` and `10` store alike.
fn number_value(n: f64) -> Option<Value> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Some(Value::Number((n as i64).into()));
    }
    Number::from_f64(n).map(Value::Number)
}

fn cast_failed(rule: &FieldRule, v: &Value) -> String {
    format!("Cast to {} failed for value {} at path \"{}\"", rule.kind.name(), v, rule.name)
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Cast one value by its rule. Null stays null; required checks happen in validation.
pub fn cast_value(rule: &FieldRule, v: &Value) -> Result<Value, String> {
    if v.is_null() {
        return Ok(Value::Null);
    }
    match rule.kind {
        FieldKind::Text | FieldKind::Enum(_) | FieldKind::Uuid => {
            let s = as_text(v).ok_or_else(|| cast_failed(rule, v))?;
            Ok(Value::String(if rule.trim { s.trim().to_string() } else { s }))
        }
        FieldKind::Number => {
            if matches!(v, Value::String(s) if s.trim().is_empty()) {
                return Ok(Value::Null);
            }
            as_number(v)
                .and_then(number_value)
                .ok_or_else(|| cast_failed(rule, v))
        }
        FieldKind::Integer => {
            if matches!(v, Value::String(s) if s.trim().is_empty()) {
                return Ok(Value::Null);
            }
            as_number(v)
                .filter(|n| n.fract() == 0.0)
                .and_then(number_value)
                .ok_or_else(|| cast_failed(rule, v))
        }
        FieldKind::Timestamp => {
            let ts = match v {
                Value::String(s) => parse_timestamp(s),
                Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
                _ => None,
            };
            ts.map(|ts| Value::String(format_timestamp(ts)))
                .ok_or_else(|| cast_failed(rule, v))
        }
        FieldKind::TextArray => match v {
            Value::Array(items) => items
                .iter()
                .map(|item| as_text(item).map(Value::String).ok_or_else(|| cast_failed(rule, item)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::String(s) => Ok(Value::Array(vec![Value::String(s.clone())])),
            _ => Err(cast_failed(rule, v)),
        },
    }
}

/// Cast every known, writable key of `input`. Unknown and read-only keys are dropped.
/// Cast failures are collected per field.
pub fn cast_document(schema: &Schema, input: Map<String, Value>) -> Result<Map<String, Value>, ValidationErrors> {
    let mut out = Map::new();
    let mut errors = ValidationErrors::new(schema.model);
    for (key, value) in input {
        if schema.is_read_only(&key) {
            continue;
        }
        let Some(rule) = schema.field(&key) else {
            tracing::debug!(field = %key, "dropping key not in schema");
            continue;
        };
        match cast_value(rule, &value) {
            Ok(v) => {
                out.insert(key, v);
            }
            Err(message) => errors.push(key, message),
        }
    }
    errors.into_result().map(|()| out)
}

/// Cast a raw query-string value for comparison against `field`.
/// Keys unknown to the schema are inferred: number, then boolean, then string.
pub fn cast_filter_value(field: &str, raw: &str) -> Result<Value, String> {
    let invalid = || format!("Invalid value \"{}\" for field \"{}\"", raw, field);
    let Some(kind) = filter_kind(field) else {
        if let Some(v) = raw.trim().parse::<f64>().ok().and_then(number_value) {
            return Ok(v);
        }
        return Ok(match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        });
    };
    match kind {
        FieldKind::Uuid => uuid::Uuid::parse_str(raw.trim())
            .map(|u| Value::String(u.to_string()))
            .map_err(|_| invalid()),
        FieldKind::Text | FieldKind::Enum(_) | FieldKind::TextArray => Ok(Value::String(raw.trim().to_string())),
        FieldKind::Number => raw.trim().parse::<f64>().ok().and_then(number_value).ok_or_else(invalid),
        FieldKind::Integer => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.fract() == 0.0)
            .and_then(number_value)
            .ok_or_else(invalid),
        FieldKind::Timestamp => parse_timestamp(raw)
            .map(|ts| Value::String(format_timestamp(ts)))
            .ok_or_else(invalid),
    }
}
