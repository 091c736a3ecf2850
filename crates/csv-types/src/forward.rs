//! Forward conversion: ColumnValue → field text.

use sync_core::ColumnValue;

/// Wrapper for a single rendered field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvValue(pub String);

impl CsvValue {
    /// Get the inner field string.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Get a reference to the inner field string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<ColumnValue> for CsvValue {
    fn from(value: ColumnValue) -> Self {
        match value {
            // Moves the string instead of cloning it
            ColumnValue::Text(s) => CsvValue(s),
            other => CsvValue(other.render_text()),
        }
    }
}

impl From<&ColumnValue> for CsvValue {
    fn from(value: &ColumnValue) -> Self {
        CsvValue(value.render_text())
    }
}

/// Render a row into the fields of one record. Quoting and escaping are left
/// to the record writer.
pub fn row_to_record(row: Vec<ColumnValue>) -> Vec<String> {
    row.into_iter()
        .map(|value| CsvValue::from(value).into_inner())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_null_conversion() {
        let csv_val: CsvValue = ColumnValue::Null.into();
        assert_eq!(csv_val.as_str(), "");
    }

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(CsvValue::from(ColumnValue::Bool(false)).as_str(), "false");
        assert_eq!(CsvValue::from(ColumnValue::Int64(9876543210)).as_str(), "9876543210");
        assert_eq!(CsvValue::from(ColumnValue::Float64(0.1)).as_str(), "0.1");
        assert_eq!(CsvValue::from(&ColumnValue::text("x;y")).as_str(), "x;y");
    }

    #[test]
    fn test_timestamp_conversion() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(
            CsvValue::from(ColumnValue::Timestamp(dt)).as_str(),
            "2024-01-15 10:30:00"
        );
    }

    #[test]
    fn test_row_to_record() {
        let row = vec![
            ColumnValue::Int64(1),
            ColumnValue::Null,
            ColumnValue::text("widget"),
        ];
        assert_eq!(row_to_record(row), vec!["1", "", "widget"]);
    }
}
