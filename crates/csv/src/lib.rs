//! Delimited flat-file endpoint.
//!
//! Reads and writes delimited text files with a single-byte delimiter and a
//! header row. Discovery reads the header, [`FileReader`] streams records
//! projected onto a requested column list, and [`FileWriter`] writes a header
//! followed by one record per row.

mod endpoint;
mod header;
mod reader;
mod writer;

pub use endpoint::FileEndpoint;
pub use header::{discover_schema, read_header};
pub use reader::FileReader;
pub use writer::FileWriter;
