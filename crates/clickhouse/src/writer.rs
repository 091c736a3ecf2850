//! Batch writer for ClickHouse tables.

use async_trait::async_trait;
use csv_types::infer_field_value;
use sync_core::{infer_column_types, ColumnType, Result, Row, SinkWriter, SyncError};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::client::ClickHouseClient;
use crate::sql::{create_table_statement, insert_statement};
use crate::value::encode_row;

/// Inserts each batch with one `INSERT ... FORMAT JSONCompactEachRow`
/// request.
///
/// Column types are settled on the first non-empty batch: declared types
/// when the table exists, otherwise types guessed from that batch, in which
/// case the table is created first. Text values are parsed into typed
/// columns and kept verbatim in text columns.
pub struct ClickHouseWriter {
    client: ClickHouseClient,
    table: String,
    columns: Vec<String>,
    insert_sql: String,
    types: Option<Vec<ColumnType>>,
    count: u64,
}

impl ClickHouseWriter {
    pub fn new(client: ClickHouseClient, table: &str, columns: &[String]) -> Result<Self> {
        Ok(Self {
            insert_sql: insert_statement(table, columns)?,
            client,
            table: table.to_string(),
            columns: columns.to_vec(),
            types: None,
            count: 0,
        })
    }

    async fn resolve_types(&self, first_batch: &[Row]) -> Result<Vec<ColumnType>> {
        if let Some(types) = Catalog::new(&self.client)
            .column_types(&self.table, &self.columns)
            .await?
        {
            debug!("Using declared types of {}: {types:?}", self.table);
            return Ok(types);
        }

        // Text values are untyped fields; guess their types for the new table
        let guessed: Vec<Row> = first_batch
            .iter()
            .map(|row| row.iter().map(infer_field_value).collect())
            .collect();
        let types = infer_column_types(self.columns.len(), &guessed);
        let ddl = create_table_statement(&self.table, &self.columns, &types)?;
        info!("Creating table {}", self.table);
        debug!("{ddl}");
        self.client.execute(&ddl).await?;
        Ok(types)
    }

    fn encode_batch(&self, rows: Vec<Row>, types: &[ColumnType]) -> Result<String> {
        let mut body = String::new();
        for (index, row) in rows.into_iter().enumerate() {
            let coerced = row
                .into_iter()
                .zip(types)
                .zip(&self.columns)
                .map(|((value, ty), column)| {
                    value.coerce_to(ty).map_err(|e| {
                        SyncError::format(format!(
                            "row {} of batch, column '{column}': {}",
                            index + 1,
                            e.message()
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            body.push_str(&encode_row(&coerced));
            body.push('\n');
        }
        Ok(body)
    }
}

#[async_trait]
impl SinkWriter for ClickHouseWriter {
    async fn write_batch(&mut self, rows: Vec<Row>) -> Result<u64> {
        if rows.is_empty() {
            return Ok(self.count);
        }
        if let Some(row) = rows.iter().find(|row| row.len() != self.columns.len()) {
            return Err(SyncError::format(format!(
                "row has {} values, expected {}",
                row.len(),
                self.columns.len()
            )));
        }

        let types = match self.types.take() {
            Some(types) => types,
            None => self.resolve_types(&rows).await?,
        };
        let batch_len = rows.len() as u64;
        let body = self.encode_batch(rows, &types);
        self.types = Some(types);

        self.client.insert(&self.insert_sql, body?).await?;
        self.count += batch_len;
        debug!(
            "Inserted {batch_len} rows into {} ({} total)",
            self.table, self.count
        );
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::{ClickHouseConnection, ColumnKind, ColumnValue};

    fn writer(columns: &[&str]) -> ClickHouseWriter {
        let client = ClickHouseClient::new(&ClickHouseConnection {
            host: "localhost".to_string(),
            ..Default::default()
        })
        .unwrap();
        let columns: Vec<String> = columns.iter().map(|s| s.to_string()).collect();
        ClickHouseWriter::new(client, "orders", &columns).unwrap()
    }

    #[test]
    fn test_encode_batch_coerces() {
        let w = writer(&["id", "price", "note"]);
        let types = [
            ColumnType::new(ColumnKind::Int64, false),
            ColumnType::new(ColumnKind::Float64, true),
            ColumnType::new(ColumnKind::Text, true),
        ];
        let body = w
            .encode_batch(
                vec![
                    vec![
                        ColumnValue::Int64(1),
                        ColumnValue::Int64(100),
                        ColumnValue::Bool(true),
                    ],
                    vec![ColumnValue::Int64(2), ColumnValue::Null, ColumnValue::Null],
                ],
                &types,
            )
            .unwrap();
        assert_eq!(body, "[1,100.0,\"true\"]\n[2,null,null]\n");
    }

    #[test]
    fn test_encode_batch_keeps_field_text() {
        let w = writer(&["code", "amount"]);
        let types = [
            ColumnType::new(ColumnKind::Text, false),
            ColumnType::new(ColumnKind::Float64, false),
        ];
        let body = w
            .encode_batch(
                vec![
                    vec![ColumnValue::text("1.50"), ColumnValue::text("1.50")],
                    vec![ColumnValue::Null, ColumnValue::text("+5")],
                ],
                &types,
            )
            .unwrap();
        assert_eq!(body, "[\"1.50\",1.5]\n[\"\",5.0]\n");
    }

    #[test]
    fn test_encode_batch_rejects_null_in_non_nullable() {
        let w = writer(&["id"]);
        let types = [ColumnType::new(ColumnKind::Int64, false)];
        let err = w
            .encode_batch(vec![vec![ColumnValue::Null]], &types)
            .unwrap_err();
        assert!(matches!(err, SyncError::Format(_)));
        assert!(err.to_string().contains("'id'"));
    }

    #[test]
    fn test_encode_batch_rejects_narrowing() {
        let w = writer(&["id"]);
        let types = [ColumnType::new(ColumnKind::Int64, true)];
        let err = w
            .encode_batch(vec![vec![ColumnValue::Float64(1.5)]], &types)
            .unwrap_err();
        assert!(matches!(err, SyncError::Format(_)));
    }

    #[tokio::test]
    async fn test_empty_batch_sends_nothing() {
        // No server is listening; an empty batch must not touch the network
        let mut w = writer(&["id"]);
        assert_eq!(w.write_batch(Vec::new()).await.unwrap(), 0);
    }
}
