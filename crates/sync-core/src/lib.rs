//! Core types for the clickhouse-bridge transfer engine.
//!
//! This crate provides the foundational types shared by every endpoint:
//!
//! - [`ColumnValue`] - one typed cell, with text rendering and JSON encoding
//! - [`ColumnType`] - column kind plus nullability, and first-batch inference
//! - [`SchemaDescriptor`] - discovered table/file name and ordered columns
//! - [`SyncError`] - the error taxonomy with a distinct [`ErrorKind`]
//! - [`Config`] / [`IngestRequest`] - self-contained per-request configuration
//! - [`Endpoint`], [`SourceReader`], [`SinkWriter`] - endpoint traits
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── csv-types          (ColumnValue <-> delimited text)
//!    ├─── bridge-csv         (FileEndpoint: header discovery, reader, writer)
//!    └─── bridge-clickhouse  (ClickHouseEndpoint: catalog, reader, writer)
//! ```

pub mod config;
pub mod error;
pub mod identifier;
pub mod schema;
pub mod traits;
pub mod types;
pub mod values;

// Re-exports for convenience
pub use config::{parse_delimiter, ClickHouseConnection, Config, IngestRequest, SourceKind};
pub use error::{ErrorKind, Result, SyncError};
pub use schema::{validate_column_list, SchemaDescriptor};
pub use traits::{Endpoint, SinkWriter, SourceReader};
pub use types::{infer_column_types, ColumnKind, ColumnType};
pub use values::{parse_timestamp, ColumnValue, Row};
