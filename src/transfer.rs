//! Transfer engine: source reader → bounded batches → sink writer.
//!
//! One transfer walks `Idle → Discovering → Streaming → Completed | Failed`.
//! Rows are pulled until a batch is full or the source is exhausted, and each
//! batch is written before the next one is pulled, so sink order equals
//! source order and at most one batch is held in memory. The first error
//! ends the transfer; batches already committed stay committed.

use std::fmt;

use sync_core::{Endpoint, Result, Row, SinkWriter, SourceReader, SyncError};
use tracing::{debug, info, warn};

/// Default number of rows per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Lifecycle of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    Discovering,
    Streaming,
    Completed,
    Failed,
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferState::Idle => "idle",
            TransferState::Discovering => "discovering",
            TransferState::Streaming => "streaming",
            TransferState::Completed => "completed",
            TransferState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of one transfer: rows committed to the sink and the error that
/// ended it, if any.
#[derive(Debug)]
pub struct TransferOutcome {
    pub rows_transferred: u64,
    pub error: Option<SyncError>,
}

impl TransferOutcome {
    pub fn completed(rows_transferred: u64) -> Self {
        Self {
            rows_transferred,
            error: None,
        }
    }

    pub fn failed(rows_transferred: u64, error: SyncError) -> Self {
        Self {
            rows_transferred,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Row count on success, the error otherwise.
    pub fn into_result(self) -> Result<u64> {
        match self.error {
            None => Ok(self.rows_transferred),
            Some(e) => Err(e),
        }
    }
}

/// Names both sides of one transfer.
#[derive(Debug, Clone)]
pub struct TransferPlan<'a> {
    pub source_object: &'a str,
    pub sink_object: &'a str,
    pub columns: &'a [String],
}

/// Runs transfers with a fixed batch size.
pub struct TransferEngine {
    batch_size: usize,
    state: TransferState,
}

impl TransferEngine {
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(SyncError::config("batch size must be a positive integer"));
        }
        Ok(Self {
            batch_size,
            state: TransferState::Idle,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    fn transition(&mut self, next: TransferState) {
        debug!("Transfer state {} -> {next}", self.state);
        self.state = next;
    }

    /// Open the reader, then the writer, stream every row and close both.
    pub async fn run(
        &mut self,
        source: &dyn Endpoint,
        sink: &dyn Endpoint,
        plan: &TransferPlan<'_>,
    ) -> TransferOutcome {
        info!(
            "Starting transfer {} -> {} ({} columns, batch size {})",
            plan.source_object,
            plan.sink_object,
            plan.columns.len(),
            self.batch_size
        );
        self.transition(TransferState::Discovering);

        let mut reader = match source.open_reader(plan.source_object, plan.columns).await {
            Ok(reader) => reader,
            Err(e) => return self.finish(TransferOutcome::failed(0, e)),
        };

        let mut writer = match sink.open_writer(plan.sink_object, plan.columns).await {
            Ok(writer) => writer,
            Err(e) => {
                close_reader(reader.as_mut()).await;
                return self.finish(TransferOutcome::failed(0, e));
            }
        };

        self.transition(TransferState::Streaming);
        let mut outcome = transfer_rows(reader.as_mut(), writer.as_mut(), self.batch_size).await;

        close_reader(reader.as_mut()).await;
        if let Err(e) = writer.close().await {
            if outcome.error.is_none() {
                outcome.error = Some(e);
            } else {
                warn!("Failed to close sink after error: {e}");
            }
        }

        self.finish(outcome)
    }

    fn finish(&mut self, outcome: TransferOutcome) -> TransferOutcome {
        match &outcome.error {
            None => {
                self.transition(TransferState::Completed);
                info!("Transfer completed: {} rows", outcome.rows_transferred);
            }
            Some(e) => {
                self.transition(TransferState::Failed);
                warn!(
                    "Transfer failed after {} rows: {e}",
                    outcome.rows_transferred
                );
            }
        }
        outcome
    }
}

async fn close_reader(reader: &mut dyn SourceReader) {
    if let Err(e) = reader.close().await {
        warn!("Failed to close source: {e}");
    }
}

/// Pull rows into batches of at most `batch_size` and write each batch
/// before pulling the next. A source of `n` rows produces `ceil(n / b)`
/// write calls and an empty batch is never written.
pub async fn transfer_rows(
    reader: &mut dyn SourceReader,
    writer: &mut dyn SinkWriter,
    batch_size: usize,
) -> TransferOutcome {
    let batch_size = batch_size.max(1);
    let mut count: u64 = 0;
    let mut exhausted = false;

    while !exhausted {
        let mut batch: Vec<Row> = Vec::with_capacity(batch_size);
        while batch.len() < batch_size {
            match reader.next_row().await {
                Ok(Some(row)) => batch.push(row),
                Ok(None) => {
                    exhausted = true;
                    break;
                }
                Err(e) => return TransferOutcome::failed(count, e),
            }
        }

        if batch.is_empty() {
            break;
        }

        let batch_len = batch.len();
        match writer.write_batch(batch).await {
            Ok(total) => count = total,
            Err(e) => return TransferOutcome::failed(count, e),
        }
        debug!("Committed batch of {batch_len} rows ({count} total)");
    }

    TransferOutcome::completed(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use sync_core::{ColumnValue, SchemaDescriptor};

    /// Source yielding `rows` integer rows, optionally failing at one index.
    struct FakeReader {
        columns: Vec<String>,
        next: usize,
        rows: usize,
        fail_at: Option<usize>,
        closed: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl SourceReader for FakeReader {
        fn columns(&self) -> &[String] {
            &self.columns
        }

        async fn next_row(&mut self) -> Result<Option<Row>> {
            if self.fail_at == Some(self.next) {
                return Err(SyncError::format(format!("bad row {}", self.next)));
            }
            if self.next >= self.rows {
                return Ok(None);
            }
            self.next += 1;
            Ok(Some(vec![ColumnValue::Int64(self.next as i64)]))
        }

        async fn close(&mut self) -> Result<()> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    /// Sink recording every batch, optionally failing on one write call.
    #[derive(Default)]
    struct FakeWriter {
        batches: Arc<Mutex<Vec<Vec<Row>>>>,
        fail_on_call: Option<usize>,
        count: u64,
        closed: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl SinkWriter for FakeWriter {
        async fn write_batch(&mut self, rows: Vec<Row>) -> Result<u64> {
            let mut batches = self.batches.lock().unwrap();
            if self.fail_on_call == Some(batches.len()) {
                return Err(SyncError::write("insert rejected"));
            }
            self.count += rows.len() as u64;
            batches.push(rows);
            Ok(self.count)
        }

        async fn close(&mut self) -> Result<()> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    fn reader(rows: usize) -> FakeReader {
        FakeReader {
            columns: vec!["id".to_string()],
            next: 0,
            rows,
            fail_at: None,
            closed: Arc::default(),
        }
    }

    #[tokio::test]
    async fn test_write_calls_per_row_count() {
        let b = 4;
        for n in [0, 1, b - 1, b, b + 1, 2 * b] {
            let mut source = reader(n);
            let mut sink = FakeWriter::default();

            let outcome = transfer_rows(&mut source, &mut sink, b).await;
            assert!(outcome.is_success());
            assert_eq!(outcome.rows_transferred, n as u64, "n = {n}");

            let batches = sink.batches.lock().unwrap();
            assert_eq!(batches.len(), n.div_ceil(b), "n = {n}");
            assert!(batches.iter().all(|batch| !batch.is_empty() && batch.len() <= b));

            let ids: Vec<Row> = batches.iter().flatten().cloned().collect();
            let expected: Vec<Row> = (1..=n as i64).map(|i| vec![ColumnValue::Int64(i)]).collect();
            assert_eq!(ids, expected, "order must be preserved for n = {n}");
        }
    }

    #[tokio::test]
    async fn test_read_error_keeps_committed_batches() {
        let mut source = reader(10);
        source.fail_at = Some(5);
        let mut sink = FakeWriter::default();

        let outcome = transfer_rows(&mut source, &mut sink, 2).await;
        assert_eq!(outcome.rows_transferred, 4);
        assert!(matches!(outcome.error, Some(SyncError::Format(_))));
        // The pending fifth row is dropped, not written
        assert_eq!(sink.batches.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_write_error_short_circuits() {
        let mut source = reader(10);
        let mut sink = FakeWriter {
            fail_on_call: Some(1),
            ..Default::default()
        };

        let outcome = transfer_rows(&mut source, &mut sink, 3).await;
        assert_eq!(outcome.rows_transferred, 3);
        assert!(matches!(outcome.error, Some(SyncError::Write(_))));
        // Nothing is pulled past the failing batch
        assert_eq!(source.next, 6);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(
            TransferEngine::new(0),
            Err(SyncError::Config(_))
        ));
    }

    /// Endpoint handing out one fake reader and one fake writer.
    struct FakeEndpoint {
        rows: usize,
        fail_open_writer: bool,
        reader_closed: Arc<Mutex<bool>>,
        writer_closed: Arc<Mutex<bool>>,
        batches: Arc<Mutex<Vec<Vec<Row>>>>,
    }

    impl FakeEndpoint {
        fn new(rows: usize) -> Self {
            Self {
                rows,
                fail_open_writer: false,
                reader_closed: Arc::default(),
                writer_closed: Arc::default(),
                batches: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl Endpoint for FakeEndpoint {
        async fn check(&self) -> Result<()> {
            Ok(())
        }

        async fn discover(&self) -> Result<Vec<SchemaDescriptor>> {
            Ok(vec![])
        }

        async fn open_reader(
            &self,
            _object: &str,
            columns: &[String],
        ) -> Result<Box<dyn SourceReader>> {
            Ok(Box::new(FakeReader {
                columns: columns.to_vec(),
                next: 0,
                rows: self.rows,
                fail_at: None,
                closed: self.reader_closed.clone(),
            }))
        }

        async fn open_writer(
            &self,
            object: &str,
            _columns: &[String],
        ) -> Result<Box<dyn SinkWriter>> {
            if self.fail_open_writer {
                return Err(SyncError::not_found(format!("no such sink {object}")));
            }
            Ok(Box::new(FakeWriter {
                batches: self.batches.clone(),
                closed: self.writer_closed.clone(),
                ..Default::default()
            }))
        }
    }

    #[tokio::test]
    async fn test_engine_completes_and_closes_both_sides() {
        let source = FakeEndpoint::new(5);
        let sink = FakeEndpoint::new(0);
        let columns = vec!["id".to_string()];
        let plan = TransferPlan {
            source_object: "src",
            sink_object: "dst",
            columns: &columns,
        };

        let mut engine = TransferEngine::new(2).unwrap();
        assert_eq!(engine.state(), TransferState::Idle);

        let outcome = engine.run(&source, &sink, &plan).await;
        assert_eq!(outcome.into_result().unwrap(), 5);
        assert_eq!(engine.state(), TransferState::Completed);
        assert!(*source.reader_closed.lock().unwrap());
        assert!(*sink.writer_closed.lock().unwrap());
        assert_eq!(sink.batches.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_engine_fails_when_sink_cannot_open() {
        let source = FakeEndpoint::new(5);
        let mut sink = FakeEndpoint::new(0);
        sink.fail_open_writer = true;
        let columns = vec!["id".to_string()];
        let plan = TransferPlan {
            source_object: "src",
            sink_object: "dst",
            columns: &columns,
        };

        let mut engine = TransferEngine::new(2).unwrap();
        let outcome = engine.run(&source, &sink, &plan).await;

        assert_eq!(outcome.rows_transferred, 0);
        assert!(matches!(outcome.error, Some(SyncError::NotFound(_))));
        assert_eq!(engine.state(), TransferState::Failed);
        assert!(*source.reader_closed.lock().unwrap());
    }
}
