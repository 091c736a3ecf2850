//! Statement builders. Identifiers are validated and back-quoted; values
//! never appear in statement text.

use sync_core::identifier::{quote_column_list, quote_identifier, quote_table};
use sync_core::{ColumnKind, ColumnType, Result, SyncError};

/// Engine clause for tables created by a transfer.
pub const DEFAULT_ENGINE: &str = "MergeTree ORDER BY tuple()";

/// ClickHouse type used when creating a column of the given type.
pub fn clickhouse_type(column_type: &ColumnType) -> String {
    let base = match column_type.kind {
        ColumnKind::Int64 => "Int64",
        ColumnKind::Float64 => "Float64",
        ColumnKind::Text => "String",
        ColumnKind::Bool => "Bool",
        ColumnKind::Timestamp => "DateTime64(6, 'UTC')",
    };
    if column_type.nullable {
        format!("Nullable({base})")
    } else {
        base.to_string()
    }
}

pub fn select_statement(table: &str, columns: &[String]) -> Result<String> {
    Ok(format!(
        "SELECT {} FROM {} FORMAT JSONCompactEachRowWithNamesAndTypes",
        quote_column_list(columns)?,
        quote_table(table)?
    ))
}

pub fn insert_statement(table: &str, columns: &[String]) -> Result<String> {
    Ok(format!(
        "INSERT INTO {} ({}) FORMAT JSONCompactEachRow",
        quote_table(table)?,
        quote_column_list(columns)?
    ))
}

pub fn create_table_statement(
    table: &str,
    columns: &[String],
    types: &[ColumnType],
) -> Result<String> {
    if columns.len() != types.len() {
        return Err(SyncError::config(format!(
            "{} columns but {} types",
            columns.len(),
            types.len()
        )));
    }

    let definitions = columns
        .iter()
        .zip(types)
        .map(|(name, ty)| Ok(format!("{} {}", quote_identifier(name)?, clickhouse_type(ty))))
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({}) ENGINE = {DEFAULT_ENGINE}",
        quote_table(table)?,
        definitions.join(", ")
    ))
}
