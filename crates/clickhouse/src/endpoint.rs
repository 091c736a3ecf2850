use async_trait::async_trait;
use sync_core::{
    ClickHouseConnection, Endpoint, Result, SchemaDescriptor, SinkWriter, SourceReader,
};

use crate::catalog::Catalog;
use crate::client::ClickHouseClient;
use crate::reader::ClickHouseReader;
use crate::writer::ClickHouseWriter;

/// A ClickHouse database reached over its HTTP interface.
#[derive(Clone)]
pub struct ClickHouseEndpoint {
    client: ClickHouseClient,
}

impl ClickHouseEndpoint {
    pub fn new(connection: &ClickHouseConnection) -> Result<Self> {
        Ok(Self {
            client: ClickHouseClient::new(connection)?,
        })
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }
}

#[async_trait]
impl Endpoint for ClickHouseEndpoint {
    async fn check(&self) -> Result<()> {
        self.client.ping().await
    }

    async fn discover(&self) -> Result<Vec<SchemaDescriptor>> {
        Catalog::new(&self.client).discover().await
    }

    async fn open_reader(&self, object: &str, columns: &[String]) -> Result<Box<dyn SourceReader>> {
        Ok(Box::new(
            ClickHouseReader::open(&self.client, object, columns).await?,
        ))
    }

    async fn open_writer(&self, object: &str, columns: &[String]) -> Result<Box<dyn SinkWriter>> {
        Ok(Box::new(ClickHouseWriter::new(
            self.client.clone(),
            object,
            columns,
        )?))
    }
}
