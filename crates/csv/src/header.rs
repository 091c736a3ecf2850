//! Header-row discovery.

use std::fs::File;
use std::path::Path;

use sync_core::{Result, SchemaDescriptor, SyncError};

const UTF8_BOM: char = '\u{feff}';

/// Read the first record of `path` as column names.
///
/// `NotFoundError` when the file is missing, `FormatError` when it is empty or
/// the header repeats a name.
pub fn read_header(path: &str, delimiter: u8) -> Result<Vec<String>> {
    let file = File::open(Path::new(path))
        .map_err(|e| SyncError::from_io(e, path, SyncError::Format))?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(file);

    let mut record = csv::StringRecord::new();
    let found = csv_reader
        .read_record(&mut record)
        .map_err(|e| SyncError::format(format!("failed to read header of {path}: {e}")))?;
    if !found {
        return Err(SyncError::format(format!("file is empty: {path}")));
    }

    let columns: Vec<String> = record
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if i == 0 {
                name.trim_start_matches(UTF8_BOM).to_string()
            } else {
                name.to_string()
            }
        })
        .collect();

    for (i, name) in columns.iter().enumerate() {
        if columns[..i].contains(name) {
            return Err(SyncError::format(format!(
                "header of {path} repeats column '{name}'"
            )));
        }
    }

    Ok(columns)
}

/// Discover the single schema a flat file exposes. The descriptor's table is
/// the file path.
///
/// A header without the delimiter is a `FormatError`, which catches a wrong
/// delimiter before a transfer is attempted.
pub fn discover_schema(path: &str, delimiter: u8) -> Result<SchemaDescriptor> {
    let columns = read_header(path, delimiter)?;
    if columns.len() < 2 {
        return Err(SyncError::format(format!(
            "delimiter '{}' does not occur in the first line of {path}",
            delimiter as char
        )));
    }
    Ok(SchemaDescriptor::new(path, columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{content}").unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_semicolon_header() {
        let temp_file = file_with("a;b\n1;2\n");
        let path = temp_file.path().to_str().unwrap();

        let schema = discover_schema(path, b';').unwrap();
        assert_eq!(schema.table, path);
        assert_eq!(schema.columns, vec!["a", "b"]);
    }

    #[test]
    fn test_header_order_is_preserved() {
        let temp_file = file_with("zeta,alpha,mid\n");
        let path = temp_file.path().to_str().unwrap();
        assert_eq!(
            read_header(path, b',').unwrap(),
            vec!["zeta", "alpha", "mid"]
        );
    }

    #[test]
    fn test_bom_is_stripped() {
        let temp_file = file_with("\u{feff}id,name\n");
        let path = temp_file.path().to_str().unwrap();
        assert_eq!(read_header(path, b',').unwrap(), vec!["id", "name"]);
    }

    #[test]
    fn test_missing_file() {
        let err = discover_schema("/nonexistent/dir/data.csv", b',').unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)), "got {err:?}");
    }

    #[test]
    fn test_empty_file() {
        let temp_file = file_with("");
        let err = discover_schema(temp_file.path().to_str().unwrap(), b',').unwrap_err();
        assert!(matches!(err, SyncError::Format(_)), "got {err:?}");
    }

    #[test]
    fn test_wrong_delimiter() {
        let temp_file = file_with("a;b\n1;2\n");
        let path = temp_file.path().to_str().unwrap();

        let err = discover_schema(path, b',').unwrap_err();
        assert!(matches!(err, SyncError::Format(_)), "got {err:?}");

        // A single-column header is still readable for transfers
        assert_eq!(read_header(path, b',').unwrap(), vec!["a;b"]);
    }

    #[test]
    fn test_duplicate_header() {
        let temp_file = file_with("id,id\n");
        let err = read_header(temp_file.path().to_str().unwrap(), b',').unwrap_err();
        assert!(matches!(err, SyncError::Format(_)));
    }
}
