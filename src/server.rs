//! HTTP JSON API.
//!
//! - `POST /connect` with a [`Config`] body returns `{"status":"connected"}`
//! - `POST /schemas` with a [`Config`] body returns `[{"table","columns"}]`
//! - `POST /ingest` with an [`IngestRequest`] body returns `{"count": n}`
//! - `GET /health` returns `{"status":"ok"}`
//!
//! Failures return `{"kind","message"}` (plus `count` for `/ingest`) with
//! status 400 for caller errors and 500 otherwise.

use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use sync_core::{Config, IngestRequest, SchemaDescriptor, SyncError};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, info_span, Instrument};

use crate::operations;

/// Server-wide settings. Connection settings are never stored here.
#[derive(Debug, Clone)]
pub struct AppState {
    pub batch_size: usize,
}

/// Error response body.
#[derive(Debug)]
pub struct ApiError {
    error: SyncError,
    count: Option<u64>,
}

impl ApiError {
    fn with_count(error: SyncError, count: u64) -> Self {
        Self {
            error,
            count: Some(count),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(error: SyncError) -> Self {
        Self { error, count: None }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        SyncError::config(format!("invalid request body: {}", rejection.body_text())).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.error.is_caller_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let mut body = json!({
            "kind": self.error.kind(),
            "message": self.error.message(),
        });
        if let Some(count) = self.count {
            body["count"] = json!(count);
        }

        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/connect", post(connect_handler))
        .route("/schemas", post(schemas_handler))
        .route("/ingest", post(ingest_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Serve on an already bound listener until Ctrl+C or SIGTERM.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{addr}");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server shutdown complete");
    Ok(())
}

/// Bind `addr` and serve.
pub async fn run_server(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve(listener, state).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn connect_handler(
    payload: Result<Json<Config>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(config) = payload?;
    operations::connect(&config)
        .instrument(info_span!("connect", source = %config.source))
        .await?;
    Ok(Json(json!({"status": "connected"})))
}

async fn schemas_handler(
    payload: Result<Json<Config>, JsonRejection>,
) -> Result<Json<Vec<SchemaDescriptor>>, ApiError> {
    let Json(config) = payload?;
    let schemas = operations::schemas(&config)
        .instrument(info_span!("schemas", source = %config.source))
        .await?;
    Ok(Json(schemas))
}

async fn ingest_handler(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        let error = ApiError::from(rejection).error;
        ApiError::with_count(error, 0)
    })?;

    let span = info_span!(
        "ingest",
        source = %request.source,
        target = %request.target,
        table = %request.table,
    );

    // The transfer owns its task so a dropped client connection does not
    // cancel it halfway through a batch.
    let batch_size = state.batch_size;
    let outcome = tokio::spawn(
        async move { operations::ingest(&request, batch_size).await }.instrument(span),
    )
    .await
    .map_err(|e| ApiError::with_count(SyncError::write(format!("transfer task failed: {e}")), 0))?;

    match outcome.error {
        None => Ok(Json(json!({"count": outcome.rows_transferred}))),
        Some(error) => Err(ApiError::with_count(error, outcome.rows_transferred)),
    }
}
