use async_trait::async_trait;
use sync_core::{
    parse_delimiter, Endpoint, Result, SchemaDescriptor, SinkWriter, SourceReader, SyncError,
};
use tracing::debug;

use crate::header::discover_schema;
use crate::reader::FileReader;
use crate::writer::FileWriter;

/// A delimited flat file on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileEndpoint {
    path: String,
    delimiter: u8,
}

impl FileEndpoint {
    /// Validates the delimiter before any I/O happens.
    pub fn new(path: impl Into<String>, delimiter: &str) -> Result<Self> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(SyncError::config("fileName must not be empty"));
        }
        Ok(Self {
            path,
            delimiter: parse_delimiter(delimiter)?,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

#[async_trait]
impl Endpoint for FileEndpoint {
    async fn check(&self) -> Result<()> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| SyncError::from_io(e, &self.path, SyncError::Connection))?;
        if !metadata.is_file() {
            return Err(SyncError::not_found(format!("not a file: {}", self.path)));
        }
        debug!("File {} is reachable", self.path);
        Ok(())
    }

    async fn discover(&self) -> Result<Vec<SchemaDescriptor>> {
        Ok(vec![discover_schema(&self.path, self.delimiter)?])
    }

    async fn open_reader(&self, object: &str, columns: &[String]) -> Result<Box<dyn SourceReader>> {
        Ok(Box::new(FileReader::open(object, self.delimiter, columns)?))
    }

    async fn open_writer(&self, object: &str, columns: &[String]) -> Result<Box<dyn SinkWriter>> {
        Ok(Box::new(FileWriter::create(object, self.delimiter, columns)?))
    }
}
