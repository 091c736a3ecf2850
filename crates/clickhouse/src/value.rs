//! ClickHouse type names and JSON cells to and from column values.
//!
//! `Nullable(...)` and `LowCardinality(...)` wrappers are unwrapped first.
//! Integer types map to Int64, floats to Float64, `Bool` to Bool, `Date*`
//! and `DateTime*` to Timestamp, and everything else (decimals, strings,
//! UUIDs, enums, containers) to Text.

use chrono::NaiveDate;
use csv_types::parse_timestamp;
use serde_json::Value as JsonValue;
use sync_core::{ColumnKind, ColumnType, ColumnValue};

/// Column type for a declared ClickHouse type name.
pub fn column_type_for(type_name: &str) -> ColumnType {
    let mut base = type_name.trim();
    let mut nullable = false;
    loop {
        if let Some(inner) = strip_wrapper(base, "Nullable") {
            nullable = true;
            base = inner;
        } else if let Some(inner) = strip_wrapper(base, "LowCardinality") {
            base = inner;
        } else {
            break;
        }
    }
    ColumnType::new(kind_for_base(base), nullable)
}

fn strip_wrapper<'a>(type_name: &'a str, wrapper: &str) -> Option<&'a str> {
    type_name
        .strip_prefix(wrapper)?
        .strip_prefix('(')?
        .strip_suffix(')')
        .map(str::trim)
}

fn kind_for_base(base: &str) -> ColumnKind {
    let unsigned = base.strip_prefix('U').unwrap_or(base);
    if let Some(bits) = unsigned.strip_prefix("Int") {
        if !bits.is_empty() && bits.bytes().all(|b| b.is_ascii_digit()) {
            return ColumnKind::Int64;
        }
    }

    match base {
        "Float32" | "Float64" => ColumnKind::Float64,
        "Bool" | "Boolean" => ColumnKind::Bool,
        _ if base.starts_with("Date") => ColumnKind::Timestamp,
        _ => ColumnKind::Text,
    }
}

/// Decode one JSON cell of a column with the given type.
///
/// Values that do not fit the column's kind, such as UInt64 beyond the
/// Int64 range, are kept as Text rather than rejected.
pub fn decode_value(column_type: &ColumnType, raw: &JsonValue) -> ColumnValue {
    if raw.is_null() {
        return ColumnValue::Null;
    }

    match (column_type.kind, raw) {
        (ColumnKind::Int64, JsonValue::Number(n)) => match n.as_i64() {
            Some(i) => ColumnValue::Int64(i),
            None => ColumnValue::Text(n.to_string()),
        },
        (ColumnKind::Int64, JsonValue::String(s)) => match s.parse::<i64>() {
            Ok(i) => ColumnValue::Int64(i),
            Err(_) => ColumnValue::text(s.as_str()),
        },
        (ColumnKind::Float64, JsonValue::Number(n)) => match n.as_f64() {
            Some(f) => ColumnValue::Float64(f),
            None => ColumnValue::Text(n.to_string()),
        },
        (ColumnKind::Float64, JsonValue::String(s)) => match s.parse::<f64>() {
            Ok(f) => ColumnValue::Float64(f),
            Err(_) => ColumnValue::text(s.as_str()),
        },
        (ColumnKind::Bool, JsonValue::Bool(b)) => ColumnValue::Bool(*b),
        (ColumnKind::Bool, JsonValue::Number(n)) if n.as_u64().is_some_and(|v| v <= 1) => {
            ColumnValue::Bool(n.as_u64() == Some(1))
        }
        (ColumnKind::Timestamp, JsonValue::String(s)) => match parse_date_or_time(s) {
            Some(ts) => ColumnValue::Timestamp(ts),
            None => ColumnValue::text(s.as_str()),
        },
        (_, JsonValue::String(s)) => ColumnValue::text(s.as_str()),
        (_, other) => ColumnValue::Text(other.to_string()),
    }
}

/// `Date` values arrive without a time part and decode to midnight UTC.
fn parse_date_or_time(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    parse_timestamp(s).or_else(|| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|ndt| ndt.and_utc())
    })
}

/// Encode a row as one `JSONCompactEachRow` line (without the newline).
pub fn encode_row(row: &[ColumnValue]) -> String {
    JsonValue::Array(row.iter().map(ColumnValue::to_json).collect()).to_string()
}
