//! Delimited-text conversions for sync-core types.
//!
//! This crate provides bidirectional conversions between sync-core's
//! `ColumnValue` and the string fields of a delimited flat file.
//!
//! # Modules
//!
//! - [`forward`] - ColumnValue → field text
//! - [`reverse`] - field text → ColumnValue
//!
//! # Example
//!
//! ```
//! use csv_types::{csv_string_to_column_value_inferred, CsvValue};
//! use sync_core::ColumnValue;
//!
//! // Forward: ColumnValue → field text
//! let field: CsvValue = ColumnValue::Int64(42).into();
//! assert_eq!(field.as_str(), "42");
//!
//! // Reverse: field text → ColumnValue, guessing the type
//! assert_eq!(csv_string_to_column_value_inferred("42"), ColumnValue::Int64(42));
//! assert_eq!(csv_string_to_column_value_inferred(""), ColumnValue::Null);
//! ```

pub mod forward;
pub mod reverse;

pub use forward::{row_to_record, CsvValue};
pub use reverse::{
    csv_field_to_column_value, csv_record_to_row, csv_string_to_column_value_inferred,
    infer_field_value, parse_timestamp,
};
