//! Batch writer for flat-file sinks.

use std::fs::File;

use async_trait::async_trait;
use csv_types::row_to_record;
use sync_core::{Result, Row, SinkWriter, SyncError};
use tracing::debug;

/// Writes a header and then one record per row. Each batch is flushed before
/// `write_batch` returns.
pub struct FileWriter {
    path: String,
    width: usize,
    writer: csv::Writer<File>,
    count: u64,
}

impl FileWriter {
    /// Create or truncate `path` and write `columns` as the header.
    pub fn create(path: &str, delimiter: u8, columns: &[String]) -> Result<Self> {
        let file =
            File::create(path).map_err(|e| SyncError::from_io(e, path, SyncError::Write))?;

        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);

        writer
            .write_record(columns)
            .and_then(|_| writer.flush().map_err(csv::Error::from))
            .map_err(|e| SyncError::write(format!("failed to write header to {path}: {e}")))?;

        debug!("Created {path} with {} columns", columns.len());

        Ok(Self {
            path: path.to_string(),
            width: columns.len(),
            writer,
            count: 0,
        })
    }
}

#[async_trait]
impl SinkWriter for FileWriter {
    async fn write_batch(&mut self, rows: Vec<Row>) -> Result<u64> {
        if let Some(row) = rows.iter().find(|row| row.len() != self.width) {
            return Err(SyncError::format(format!(
                "row has {} values, expected {}",
                row.len(),
                self.width
            )));
        }

        let batch_len = rows.len() as u64;
        let records: Vec<Vec<String>> = rows.into_iter().map(row_to_record).collect();

        for record in &records {
            self.writer.write_record(record).map_err(|e| {
                SyncError::write(format!("failed to write record to {}: {e}", self.path))
            })?;
        }
        self.writer
            .flush()
            .map_err(|e| SyncError::write(format!("failed to flush {}: {e}", self.path)))?;

        self.count += batch_len;
        debug!("Wrote {batch_len} records to {} ({} total)", self.path, self.count);
        Ok(self.count)
    }

    async fn close(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| SyncError::write(format!("failed to flush {}: {e}", self.path)))
    }
}
