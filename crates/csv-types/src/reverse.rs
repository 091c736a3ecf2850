//! Reverse conversion: field text → ColumnValue.
//!
//! Flat files carry no type information. A record is read verbatim: an empty
//! field is Null and every other field is Text holding the exact field. A
//! type is guessed only where one is needed, using these rules:
//!
//! - empty field → Null
//! - integer without leading zeros → Int64
//! - finite float, or `nan` / `inf` / `-inf` → Float64
//! - `true` / `false` (any case) → Bool
//! - RFC 3339 or `YYYY-MM-DD HH:MM:SS[.f]` → Timestamp (naive values are UTC)
//! - anything else → Text

use sync_core::ColumnValue;

pub use sync_core::parse_timestamp;

/// Read one field without interpreting it.
pub fn csv_field_to_column_value(value: &str) -> ColumnValue {
    if value.is_empty() {
        ColumnValue::Null
    } else {
        ColumnValue::text(value)
    }
}

/// Decode one field by inference.
pub fn csv_string_to_column_value_inferred(value: &str) -> ColumnValue {
    if value.is_empty() {
        return ColumnValue::Null;
    }

    if !has_leading_zero(value) {
        // Try integer
        if let Ok(i) = value.parse::<i64>() {
            return ColumnValue::Int64(i);
        }

        // Try float
        if let Ok(f) = value.parse::<f64>() {
            if f.is_finite() || matches!(value, "nan" | "inf" | "-inf") {
                return ColumnValue::Float64(f);
            }
        }
    }

    // Try boolean
    if value.eq_ignore_ascii_case("true") {
        return ColumnValue::Bool(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return ColumnValue::Bool(false);
    }

    if let Some(ts) = parse_timestamp(value) {
        return ColumnValue::Timestamp(ts);
    }

    // Default to string
    ColumnValue::text(value)
}

/// Guess the type of a value read from a flat file. Values that are not
/// Text already carry a type and are returned unchanged.
pub fn infer_field_value(value: &ColumnValue) -> ColumnValue {
    match value {
        ColumnValue::Text(text) => csv_string_to_column_value_inferred(text),
        other => other.clone(),
    }
}

/// Read every field of a record verbatim.
pub fn csv_record_to_row<'a, I>(fields: I) -> Vec<ColumnValue>
where
    I: IntoIterator<Item = &'a str>,
{
    fields.into_iter().map(csv_field_to_column_value).collect()
}

/// Numbers like `007` are identifiers or codes, not integers.
fn has_leading_zero(value: &str) -> bool {
    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    let mut chars = digits.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('0'), Some(c)) if c.is_ascii_digit()
    )
}
