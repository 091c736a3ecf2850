//! Endpoint abstractions.
//!
//! - [`Endpoint`]: one side of a transfer (a database or a flat file)
//! - [`SourceReader`]: lazy, finite, non-restartable row sequence
//! - [`SinkWriter`]: batch-at-a-time row persistence
//!
//! The transfer engine works only against these traits, so it never branches
//! on the endpoint kind.

use async_trait::async_trait;

use crate::error::Result;
use crate::schema::SchemaDescriptor;
use crate::values::Row;

/// Reads rows from a table or file.
///
/// Every row yielded has exactly `columns().len()` values, in the order of
/// the requested column list.
#[async_trait]
pub trait SourceReader: Send {
    /// The column list this reader was opened with.
    fn columns(&self) -> &[String];

    /// Next row, or `None` once the source is exhausted.
    async fn next_row(&mut self) -> Result<Option<Row>>;

    /// Release the underlying connection or file handle.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Persists rows into a table or file.
#[async_trait]
pub trait SinkWriter: Send {
    /// Persist one batch. On success returns the running count of rows
    /// accepted so far; a failed batch contributes nothing to the count.
    async fn write_batch(&mut self, rows: Vec<Row>) -> Result<u64>;

    /// Flush and release the underlying connection or file handle.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// One side of a transfer.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Verify reachability (database ping, file existence).
    async fn check(&self) -> Result<()>;

    /// Discover the schemas this endpoint exposes.
    async fn discover(&self) -> Result<Vec<SchemaDescriptor>>;

    /// Open a reader over `object` restricted to `columns`, in that order.
    async fn open_reader(&self, object: &str, columns: &[String]) -> Result<Box<dyn SourceReader>>;

    /// Open a writer into `object` for rows shaped like `columns`.
    async fn open_writer(&self, object: &str, columns: &[String]) -> Result<Box<dyn SinkWriter>>;
}
