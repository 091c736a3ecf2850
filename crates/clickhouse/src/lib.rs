//! ClickHouse endpoint over the HTTP interface.
//!
//! Catalog discovery reads `system.tables` and `system.columns`, reads stream
//! `JSONCompactEachRowWithNamesAndTypes` line by line, and every write batch
//! is one `INSERT ... FORMAT JSONCompactEachRow` request whose rows travel in
//! the request body.

mod catalog;
mod client;
mod endpoint;
mod reader;
pub mod sql;
mod stream;
pub mod value;
mod writer;

pub use catalog::Catalog;
pub use client::ClickHouseClient;
pub use endpoint::ClickHouseEndpoint;
pub use reader::ClickHouseReader;
pub use stream::LineStream;
pub use writer::ClickHouseWriter;
