//! Test infrastructure shared by unit and integration tests.

pub mod mock_clickhouse;

pub use mock_clickhouse::{MockClickHouse, MockTable, MOCK_DATABASE, MOCK_KEY};
