//! Typed conversions from raw patch values. Errors are short reasons; the
//! applicator adds the field and value context.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use domainid_core::SysStatus;

pub(super) fn string(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(format!("expected a string, found {}", kind(other))),
    }
}

pub(super) fn optional_string(value: &Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        other => string(other).map(Some),
    }
}

pub(super) fn guid<I: From<Uuid>>(value: &Value) -> Result<I, String> {
    let raw = string(value)?;
    Uuid::parse_str(&raw)
        .map(I::from)
        .map_err(|e| format!("invalid GUID ({e})"))
}

pub(super) fn status(value: &Value) -> Result<SysStatus, String> {
    string(value)?.parse().map_err(|_| "unknown SysStatus literal".to_string())
}

/// RFC 3339, or an ISO 8601 local date-time taken as UTC.
pub(super) fn timestamp(value: &Value) -> Result<DateTime<Utc>, String> {
    let raw = string(value)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp ({e})"))
}

pub(super) fn string_map(value: &Value) -> Result<BTreeMap<String, String>, String> {
    let Value::Object(entries) = value else {
        return Err(format!("expected an object, found {}", kind(value)));
    };
    entries
        .iter()
        .map(|(k, v)| string(v).map(|s| (k.clone(), s)))
        .collect()
}

/// Upsert `incoming` into `existing` when merging, else replace wholesale.
pub(super) fn merge_map(
    existing: &mut Option<BTreeMap<String, String>>,
    incoming: BTreeMap<String, String>,
    merge: bool,
) {
    match existing {
        Some(current) if merge => current.extend(incoming),
        _ => *existing = Some(incoming),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
