//! Streaming table reader.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sync_core::{ColumnType, Result, Row, SourceReader, SyncError};
use tracing::debug;

use crate::client::ClickHouseClient;
use crate::sql::select_statement;
use crate::stream::LineStream;
use crate::value::{column_type_for, decode_value};

/// Prefix of an exception the server appends to a response that has
/// already started streaming.
const EXCEPTION_PREFIX: &str = "Code:";

/// Streams `SELECT <columns> FROM <table>` one row at a time.
pub struct ClickHouseReader {
    table: String,
    columns: Vec<String>,
    types: Vec<ColumnType>,
    lines: LineStream,
    rows_read: u64,
}

impl ClickHouseReader {
    /// Issue the query and consume the names and types header lines.
    pub async fn open(client: &ClickHouseClient, table: &str, columns: &[String]) -> Result<Self> {
        let sql = select_statement(table, columns)?;
        let response = client.query_stream(&sql).await?;
        Self::from_lines(LineStream::from_response(response), table, columns).await
    }

    /// Build a reader over an already started response.
    pub async fn from_lines(
        mut lines: LineStream,
        table: &str,
        columns: &[String],
    ) -> Result<Self> {
        let names: Vec<String> = parse_header_line(&mut lines, "names").await?;
        if names != columns {
            return Err(SyncError::query(format!(
                "server returned columns {names:?}, requested {columns:?}"
            )));
        }

        let type_names: Vec<String> = parse_header_line(&mut lines, "types").await?;
        if type_names.len() != columns.len() {
            return Err(SyncError::query(format!(
                "server returned {} types for {} columns",
                type_names.len(),
                columns.len()
            )));
        }
        let types = type_names.iter().map(|t| column_type_for(t)).collect();
        debug!("Reading {table} with types {type_names:?}");

        Ok(Self {
            table: table.to_string(),
            columns: columns.to_vec(),
            types,
            lines,
            rows_read: 0,
        })
    }
}

async fn parse_header_line(lines: &mut LineStream, what: &str) -> Result<Vec<String>> {
    let line = lines
        .next_line()
        .await?
        .ok_or_else(|| SyncError::query(format!("response ended before column {what}")))?;
    check_exception(&line)?;
    serde_json::from_str(&line)
        .map_err(|e| SyncError::query(format!("malformed column {what} line {line:?}: {e}")))
}

fn check_exception(line: &str) -> Result<()> {
    if line.trim_start().starts_with(EXCEPTION_PREFIX) {
        return Err(SyncError::query(line.trim().to_string()));
    }
    Ok(())
}

#[async_trait]
impl SourceReader for ClickHouseReader {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Row>> {
        let line = loop {
            match self.lines.next_line().await? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };
        check_exception(&line)?;

        let cells: Vec<JsonValue> = serde_json::from_str(&line).map_err(|e| {
            SyncError::query(format!("malformed row from {}: {e}: {line:?}", self.table))
        })?;
        if cells.len() != self.types.len() {
            return Err(SyncError::query(format!(
                "row from {} has {} values, expected {}",
                self.table,
                cells.len(),
                self.types.len()
            )));
        }

        self.rows_read += 1;
        Ok(Some(
            self.types
                .iter()
                .zip(&cells)
                .map(|(ty, cell)| decode_value(ty, cell))
                .collect(),
        ))
    }

    async fn close(&mut self) -> Result<()> {
        debug!("Closed reader on {} after {} rows", self.table, self.rows_read);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use sync_core::ColumnValue;

    fn lines(body: &'static str) -> LineStream {
        let items: Vec<std::result::Result<Bytes, std::io::Error>> =
            vec![Ok(Bytes::from_static(body.as_bytes()))];
        LineStream::new(futures::stream::iter(items))
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_reads_typed_rows() {
        let body = "[\"id\",\"price\",\"sold_at\"]\n\
                    [\"UInt64\",\"Nullable(Float64)\",\"DateTime\"]\n\
                    [\"1\",100.5,\"2024-01-15T10:30:00Z\"]\n\
                    [\"2\",null,\"2024-01-16T00:00:00Z\"]\n";
        let columns = cols(&["id", "price", "sold_at"]);
        let mut reader = ClickHouseReader::from_lines(lines(body), "sales", &columns)
            .await
            .unwrap();

        let first = reader.next_row().await.unwrap().unwrap();
        assert_eq!(first[0], ColumnValue::Int64(1));
        assert_eq!(first[1], ColumnValue::Float64(100.5));
        assert!(matches!(first[2], ColumnValue::Timestamp(_)));

        let second = reader.next_row().await.unwrap().unwrap();
        assert_eq!(second[1], ColumnValue::Null);

        assert!(reader.next_row().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mid_stream_exception() {
        let body = "[\"id\"]\n[\"Int64\"]\n[1]\nCode: 241. DB::Exception: Memory limit exceeded\n";
        let mut reader = ClickHouseReader::from_lines(lines(body), "t", &cols(&["id"]))
            .await
            .unwrap();

        assert!(reader.next_row().await.unwrap().is_some());
        let err = reader.next_row().await.unwrap_err();
        assert!(matches!(err, SyncError::Query(_)));
        assert!(err.to_string().contains("Memory limit"));
    }

    #[tokio::test]
    async fn test_header_mismatch() {
        let body = "[\"other\"]\n[\"Int64\"]\n";
        let err = ClickHouseReader::from_lines(lines(body), "t", &cols(&["id"]))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SyncError::Query(_)));
    }

    #[tokio::test]
    async fn test_empty_table() {
        let body = "[\"id\"]\n[\"Int64\"]\n";
        let mut reader = ClickHouseReader::from_lines(lines(body), "t", &cols(&["id"]))
            .await
            .unwrap();
        assert!(reader.next_row().await.unwrap().is_none());
    }
}
