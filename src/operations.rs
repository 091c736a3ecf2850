//! The three bridge operations shared by the HTTP API and the CLI.
//!
//! Every call builds its endpoints from the configuration it is given and
//! drops them when it returns; nothing survives between calls.

use bridge_clickhouse::ClickHouseEndpoint;
use bridge_csv::FileEndpoint;
use sync_core::{
    ClickHouseConnection, Config, Endpoint, IngestRequest, Result, SchemaDescriptor, SourceKind,
};
use tracing::info;

use crate::transfer::{TransferEngine, TransferOutcome, TransferPlan};

fn build_endpoint(
    kind: SourceKind,
    connection: &ClickHouseConnection,
    file_name: &str,
    delimiter: &str,
) -> Result<Box<dyn Endpoint>> {
    match kind {
        SourceKind::ClickHouse => Ok(Box::new(ClickHouseEndpoint::new(connection)?)),
        SourceKind::FlatFile => Ok(Box::new(FileEndpoint::new(file_name, delimiter)?)),
    }
}

/// Endpoint described by a `/connect` or `/schemas` configuration.
pub fn endpoint_for_config(config: &Config) -> Result<Box<dyn Endpoint>> {
    build_endpoint(
        config.source,
        &config.connection,
        &config.file_name,
        &config.delimiter,
    )
}

/// Endpoint for one side of an ingest request.
pub fn endpoint_for_ingest(request: &IngestRequest, kind: SourceKind) -> Result<Box<dyn Endpoint>> {
    build_endpoint(
        kind,
        &request.connection,
        &request.file_name,
        &request.delimiter,
    )
}

/// Verify that the configured endpoint is reachable.
pub async fn connect(config: &Config) -> Result<()> {
    let endpoint = endpoint_for_config(config)?;
    endpoint.check().await?;
    info!("Connected to {}", config.source);
    Ok(())
}

/// Discover the schemas the configured endpoint exposes.
pub async fn schemas(config: &Config) -> Result<Vec<SchemaDescriptor>> {
    let endpoint = endpoint_for_config(config)?;
    let schemas = endpoint.discover().await?;
    info!("Discovered {} schemas from {}", schemas.len(), config.source);
    Ok(schemas)
}

/// Run one transfer. `default_batch_size` applies when the request does not
/// carry its own.
pub async fn ingest(request: &IngestRequest, default_batch_size: usize) -> TransferOutcome {
    match prepare_ingest(request, default_batch_size) {
        Ok((mut engine, source, sink)) => {
            let plan = TransferPlan {
                source_object: request.object_name(request.source),
                sink_object: request.object_name(request.target),
                columns: &request.columns,
            };
            engine.run(source.as_ref(), sink.as_ref(), &plan).await
        }
        Err(e) => TransferOutcome::failed(0, e),
    }
}

fn prepare_ingest(
    request: &IngestRequest,
    default_batch_size: usize,
) -> Result<(TransferEngine, Box<dyn Endpoint>, Box<dyn Endpoint>)> {
    request.validate()?;
    let engine = TransferEngine::new(request.batch_size.unwrap_or(default_batch_size))?;
    let source = endpoint_for_ingest(request, request.source)?;
    let sink = endpoint_for_ingest(request, request.target)?;
    Ok((engine, source, sink))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::SyncError;

    fn request(json: serde_json::Value) -> IngestRequest {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_rejects_same_kind() {
        let outcome = ingest(
            &request(serde_json::json!({
                "source": "Flat File",
                "target": "Flat File",
                "table": "t",
                "columns": ["id"],
                "fileName": "a.csv",
                "delimiter": ",",
                "host": "localhost"
            })),
            100,
        )
        .await;
        assert_eq!(outcome.rows_transferred, 0);
        assert!(matches!(outcome.error, Some(SyncError::Config(_))));
    }

    #[tokio::test]
    async fn test_ingest_rejects_zero_server_batch_size() {
        let outcome = ingest(
            &request(serde_json::json!({
                "source": "ClickHouse",
                "target": "Flat File",
                "table": "t",
                "columns": ["id"],
                "fileName": "a.csv",
                "delimiter": ",",
                "host": "localhost"
            })),
            0,
        )
        .await;
        assert!(matches!(outcome.error, Some(SyncError::Config(_))));
    }

    #[tokio::test]
    async fn test_connect_missing_file() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "source": "Flat File",
            "fileName": "/nonexistent/input.csv",
            "delimiter": ","
        }))
        .unwrap();
        let err = connect(&config).await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_schemas_rejects_bad_delimiter_before_io() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "source": "Flat File",
            "fileName": "/nonexistent/input.csv",
            "delimiter": ""
        }))
        .unwrap();
        let err = schemas(&config).await.unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
