//! Schema descriptors produced by discovery.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// The discovered shape of a table or file: its name and ordered column names.
///
/// Column order is discovery order and is authoritative for positional reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Table name, or the file path for flat files
    pub table: String,

    /// Column names in source-declared order
    pub columns: Vec<String>,
}

impl SchemaDescriptor {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    /// Position of a column by name.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

/// Validate an explicit column list for a transfer: non-empty, no blank
/// names, no duplicates.
pub fn validate_column_list(columns: &[String]) -> Result<()> {
    if columns.is_empty() {
        return Err(SyncError::config("column list must not be empty"));
    }

    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if column.trim().is_empty() {
            return Err(SyncError::config("column names must not be blank"));
        }
        if !seen.insert(column.as_str()) {
            return Err(SyncError::config(format!(
                "column '{column}' is listed more than once"
            )));
        }
    }
    Ok(())
}
