//! SQL identifier validation and quoting.
//!
//! Table and column names cannot be bound as query parameters, so they are
//! interpolated into query text. Every identifier must match
//! `[A-Za-z_][A-Za-z0-9_]*` before it is back-quoted; a table name may carry
//! one `database.` qualifier.

use crate::error::{Result, SyncError};

/// Maximum identifier length accepted.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate a bare identifier against the allow-list.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SyncError::config("identifier cannot be empty"));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(SyncError::config(format!(
            "identifier exceeds {MAX_IDENTIFIER_LENGTH} bytes: {name:?}"
        )));
    }

    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SyncError::config(format!(
            "invalid identifier {name:?}: only letters, digits and '_' are allowed"
        )));
    }

    Ok(())
}

/// Validate and back-quote a column identifier.
pub fn quote_identifier(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("`{name}`"))
}

/// Validate and quote a table name, optionally qualified as `database.table`.
pub fn quote_table(name: &str) -> Result<String> {
    match name.split_once('.') {
        Some((database, table)) => Ok(format!(
            "{}.{}",
            quote_identifier(database)?,
            quote_identifier(table)?
        )),
        None => quote_identifier(name),
    }
}

/// Quote a column list and join it with `, `.
pub fn quote_column_list(columns: &[String]) -> Result<String> {
    let quoted = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Result<Vec<_>>>()?;
    Ok(quoted.join(", "))
}
