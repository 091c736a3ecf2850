//! Column values moved between sources and sinks.
//!
//! A [`ColumnValue`] is one cell after it has been read from a source and
//! before it is rendered or encoded for a sink. Every variant has a text
//! rendering (flat-file sinks) and a JSON insert encoding (database sinks).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;

use crate::types::{ColumnKind, ColumnType};
use crate::error::{Result, SyncError};

/// Text layout used for timestamps in both flat files and insert bodies.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// One cell of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    /// SQL NULL / empty field
    Null,

    /// 64-bit signed integer
    Int64(i64),

    /// 64-bit floating point
    Float64(f64),

    /// String value
    Text(String),

    /// Boolean value
    Bool(bool),

    /// Date/time in UTC
    Timestamp(DateTime<Utc>),
}

/// An ordered sequence of values, positionally aligned with the transfer's
/// requested column list.
pub type Row = Vec<ColumnValue>;

impl ColumnValue {
    /// Create a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The kind of this value, `None` for null.
    pub fn kind(&self) -> Option<ColumnKind> {
        match self {
            Self::Null => None,
            Self::Int64(_) => Some(ColumnKind::Int64),
            Self::Float64(_) => Some(ColumnKind::Float64),
            Self::Text(_) => Some(ColumnKind::Text),
            Self::Bool(_) => Some(ColumnKind::Bool),
            Self::Timestamp(_) => Some(ColumnKind::Timestamp),
        }
    }

    /// Render this value as a flat-file field. Null renders as an empty string.
    pub fn render_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Int64(i) => i.to_string(),
            Self::Float64(f) => render_float(*f),
            Self::Text(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::Timestamp(ts) => render_timestamp(ts),
        }
    }

    /// Encode this value for a JSON insert body. Null encodes as JSON `null`,
    /// which the database stores as SQL NULL in a nullable column.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Int64(i) => JsonValue::from(*i),
            Self::Float64(f) => match serde_json::Number::from_f64(*f) {
                Some(n) => JsonValue::Number(n),
                // nan/inf have no JSON number form; the database parses these spellings
                None => JsonValue::String(render_float(*f)),
            },
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Timestamp(ts) => JsonValue::String(render_timestamp(ts)),
        }
    }

    /// Convert this value to the representation expected by a column of type
    /// `target`.
    ///
    /// Int64 widens to Float64 and every value renders into Text. Text is
    /// parsed into the other kinds. Null is accepted by nullable columns and
    /// becomes the empty string in a non-nullable text column.
    pub fn coerce_to(self, target: &ColumnType) -> Result<ColumnValue> {
        let kind = match self.kind() {
            None if target.nullable => return Ok(ColumnValue::Null),
            None if target.kind == ColumnKind::Text => {
                return Ok(ColumnValue::Text(String::new()))
            }
            None => {
                return Err(SyncError::format(format!(
                    "NULL does not fit non-nullable column of type {target}"
                )))
            }
            Some(kind) => kind,
        };

        match (kind, target.kind) {
            (a, b) if a == b => Ok(self),
            (ColumnKind::Int64, ColumnKind::Float64) => match self {
                ColumnValue::Int64(i) => Ok(ColumnValue::Float64(i as f64)),
                other => Ok(other),
            },
            (_, ColumnKind::Text) => Ok(ColumnValue::Text(self.render_text())),
            (ColumnKind::Text, expected) => {
                let text = self.render_text();
                parse_as(&text, expected).ok_or_else(|| {
                    SyncError::format(format!(
                        "value '{text}' does not parse as column type {expected}"
                    ))
                })
            }
            (_, expected) => Err(SyncError::format(format!(
                "value '{}' of type {kind} does not fit column of type {expected}",
                self.render_text()
            ))),
        }
    }
}

/// Parse `text` as a value of `kind`.
fn parse_as(text: &str, kind: ColumnKind) -> Option<ColumnValue> {
    let trimmed = text.trim();
    match kind {
        ColumnKind::Int64 => trimmed.parse::<i64>().ok().map(ColumnValue::Int64),
        ColumnKind::Float64 => trimmed.parse::<f64>().ok().map(ColumnValue::Float64),
        ColumnKind::Bool => {
            if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
                Some(ColumnValue::Bool(true))
            } else if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
                Some(ColumnValue::Bool(false))
            } else {
                None
            }
        }
        ColumnKind::Timestamp => parse_timestamp(trimmed).map(ColumnValue::Timestamp),
        ColumnKind::Text => Some(ColumnValue::text(text)),
    }
}

/// Parse a timestamp in RFC 3339 or `YYYY-MM-DD HH:MM:SS[.f]` (with a space
/// or `T` separator). Values without an offset are UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|ndt| ndt.and_utc())
}

fn render_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        f.to_string()
    }
}

fn render_timestamp(ts: &DateTime<Utc>) -> String {
    let nanos = ts.timestamp_subsec_nanos();
    if nanos == 0 {
        ts.format(TIMESTAMP_FORMAT).to_string()
    } else if nanos % 1_000 == 0 {
        ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.9f").to_string()
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Int64(value)
    }
}

impl From<f64> for ColumnValue {
    fn from(value: f64) -> Self {
        ColumnValue::Float64(value)
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        ColumnValue::Bool(value)
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Text(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Text(value)
    }
}

impl From<DateTime<Utc>> for ColumnValue {
    fn from(value: DateTime<Utc>) -> Self {
        ColumnValue::Timestamp(value)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ColumnValue::Null)
    }
}
