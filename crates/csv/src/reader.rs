//! Streaming record reader.

use std::fs::File;

use async_trait::async_trait;
use csv_types::csv_record_to_row;
use sync_core::{Result, Row, SourceReader, SyncError};
use tracing::debug;

/// Streams the data records of a flat file, projected onto a requested
/// column list. Fields come through verbatim: empty fields are Null and all
/// others are Text, so a text column receives exactly what the file holds.
pub struct FileReader {
    path: String,
    columns: Vec<String>,
    /// Header index of each requested column
    projection: Vec<usize>,
    header_len: usize,
    records: csv::Reader<File>,
    record: csv::StringRecord,
    rows_read: u64,
}

impl FileReader {
    /// Open `path`, read its header and resolve `columns` against it.
    ///
    /// A requested column that the header lacks is a `FormatError`.
    pub fn open(path: &str, delimiter: u8, columns: &[String]) -> Result<Self> {
        let header = crate::header::read_header(path, delimiter)?;

        let projection = columns
            .iter()
            .map(|column| {
                header.iter().position(|h| h == column).ok_or_else(|| {
                    SyncError::format(format!(
                        "column '{column}' not found in header of {path} ({})",
                        header.join(", ")
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let file =
            File::open(path).map_err(|e| SyncError::from_io(e, path, SyncError::Format))?;

        // Field counts are checked per record so the error names the record
        let mut records = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(file);
        records
            .headers()
            .map_err(|e| SyncError::format(format!("failed to read header of {path}: {e}")))?;

        debug!("Opened {path} with projection {projection:?}");

        Ok(Self {
            path: path.to_string(),
            columns: columns.to_vec(),
            projection,
            header_len: header.len(),
            records,
            record: csv::StringRecord::new(),
            rows_read: 0,
        })
    }
}

#[async_trait]
impl SourceReader for FileReader {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Row>> {
        let found = self.records.read_record(&mut self.record).map_err(|e| {
            SyncError::format(format!("failed to read record from {}: {e}", self.path))
        })?;
        if !found {
            return Ok(None);
        }
        self.rows_read += 1;

        if self.record.len() != self.header_len {
            let line = self
                .record
                .position()
                .map(|p| p.line())
                .unwrap_or(self.rows_read + 1);
            return Err(SyncError::format(format!(
                "column count mismatch in {} at line {line}: expected {} fields, found {}",
                self.path,
                self.header_len,
                self.record.len()
            )));
        }

        let record = &self.record;
        Ok(Some(csv_record_to_row(
            self.projection.iter().map(|&i| &record[i]),
        )))
    }

    async fn close(&mut self) -> Result<()> {
        debug!("Closed {} after {} records", self.path, self.rows_read);
        Ok(())
    }
}
