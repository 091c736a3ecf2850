//! Catalog queries against `system.tables` and `system.columns`.

use sync_core::{ColumnType, Result, SchemaDescriptor, SyncError};
use tracing::debug;

use crate::client::ClickHouseClient;
use crate::value::column_type_for;

const TABLES_QUERY: &str = "SELECT name FROM system.tables \
     WHERE database = {db:String} AND NOT is_temporary \
     ORDER BY name FORMAT JSONCompactEachRow";

const COLUMNS_QUERY: &str = "SELECT name, type FROM system.columns \
     WHERE database = {db:String} AND table = {table:String} \
     ORDER BY position FORMAT JSONCompactEachRow";

/// Catalog lookups for one connection.
pub struct Catalog<'a> {
    client: &'a ClickHouseClient,
}

impl<'a> Catalog<'a> {
    pub fn new(client: &'a ClickHouseClient) -> Self {
        Self { client }
    }

    /// Every table of the configured database with its columns in declared
    /// order. Any failed query discards the partial result.
    pub async fn discover(&self) -> Result<Vec<SchemaDescriptor>> {
        let database = self.client.database();
        let tables = self.list_tables(database).await?;

        let mut schemas = Vec::with_capacity(tables.len());
        for table in tables {
            let columns = self
                .list_columns(database, &table)
                .await?
                .into_iter()
                .map(|(name, _)| name)
                .collect();
            schemas.push(SchemaDescriptor::new(table, columns));
        }

        debug!("Discovered {} tables in {database}", schemas.len());
        Ok(schemas)
    }

    pub async fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        let body = self.client.query_text(TABLES_QUERY, &[("db", database)]).await?;
        parse_rows(&body)?
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .next()
                    .ok_or_else(|| SyncError::query("empty row in table listing"))
            })
            .collect()
    }

    /// `(name, type)` pairs ordered by declared position.
    pub async fn list_columns(&self, database: &str, table: &str) -> Result<Vec<(String, String)>> {
        let body = self
            .client
            .query_text(COLUMNS_QUERY, &[("db", database), ("table", table)])
            .await?;
        parse_rows(&body)?
            .into_iter()
            .map(|row| match <[String; 2]>::try_from(row) {
                Ok([name, type_name]) => Ok((name, type_name)),
                Err(row) => Err(SyncError::query(format!(
                    "expected name and type in column listing, got {row:?}"
                ))),
            })
            .collect()
    }

    /// Declared types of `columns` in an existing table, or `None` when the
    /// table does not exist. `table` may be qualified as `database.table`.
    pub async fn column_types(
        &self,
        table: &str,
        columns: &[String],
    ) -> Result<Option<Vec<ColumnType>>> {
        let (database, bare_table) = table
            .split_once('.')
            .unwrap_or((self.client.database(), table));

        let declared = self.list_columns(database, bare_table).await?;
        if declared.is_empty() {
            return Ok(None);
        }

        columns
            .iter()
            .map(|column| {
                declared
                    .iter()
                    .find(|(name, _)| name == column)
                    .map(|(_, type_name)| column_type_for(type_name))
                    .ok_or_else(|| {
                        SyncError::query(format!("table {table} has no column '{column}'"))
                    })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

/// Parse a `JSONCompactEachRow` body of string cells.
fn parse_rows(body: &str) -> Result<Vec<Vec<String>>> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str::<Vec<String>>(line).map_err(|e| {
                SyncError::query(format!("unexpected catalog response line {line:?}: {e}"))
            })
        })
        .collect()
}
