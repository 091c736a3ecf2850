//! clickhouse-bridge library
//!
//! Moves tabular data between ClickHouse and delimited flat files in either
//! direction, behind a small HTTP JSON API.
//!
//! # Crates
//!
//! - `sync_core` - column values, schemas, errors, configuration and the
//!   endpoint traits
//! - `csv_types` - column values to and from delimited text
//! - `bridge_csv` - the flat-file endpoint
//! - `bridge_clickhouse` - the ClickHouse endpoint over the HTTP interface
//!
//! This crate adds the transfer engine, the three operations (`connect`,
//! `schemas`, `ingest`) and the axum server exposing them.
//!
//! # CLI Usage
//!
//! ```bash
//! # HTTP API on port 8080
//! clickhouse-bridge serve --listen 0.0.0.0:8080
//!
//! # One-off operations with the same JSON bodies as the API
//! clickhouse-bridge connect --config clickhouse.json
//! clickhouse-bridge schemas --config file.json
//! clickhouse-bridge ingest --request ingest.json
//! ```

pub mod operations;
pub mod server;
pub mod testing;
pub mod transfer;

pub use operations::{connect, ingest, schemas};
pub use server::{router, AppState};
pub use transfer::{TransferEngine, TransferOutcome, TransferPlan, TransferState, DEFAULT_BATCH_SIZE};
