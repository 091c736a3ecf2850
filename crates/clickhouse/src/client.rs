//! Requests against the ClickHouse HTTP interface.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use sync_core::{ClickHouseConnection, Result, SyncError};
use tracing::debug;

const USER_HEADER: &str = "X-ClickHouse-User";
const KEY_HEADER: &str = "X-ClickHouse-Key";
const DATABASE_HEADER: &str = "X-ClickHouse-Database";

/// Output settings for every query so values decode the same way regardless
/// of server defaults.
const READ_SETTINGS: &[(&str, &str)] = &[
    ("date_time_output_format", "iso"),
    ("output_format_json_quote_64bit_integers", "1"),
    ("output_format_json_quote_decimals", "1"),
];

const WRITE_SETTINGS: &[(&str, &str)] = &[("date_time_input_format", "best_effort")];

/// Client bound to one connection configuration. Credentials and the
/// database travel as headers on every request.
#[derive(Clone)]
pub struct ClickHouseClient {
    http: Client,
    base_url: String,
    user: String,
    key: String,
    database: String,
}

impl ClickHouseClient {
    pub fn new(connection: &ClickHouseConnection) -> Result<Self> {
        let base_url = connection.base_url()?;
        let http = Client::builder()
            .build()
            .map_err(|e| SyncError::connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            user: connection.user_or_default().to_string(),
            key: connection.jwt.clone(),
            database: connection.database_or_default().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header(USER_HEADER, &self.user)
            .header(KEY_HEADER, &self.key)
            .header(DATABASE_HEADER, &self.database)
    }

    /// Handshake: `/ping` for reachability, then `SELECT 1` for credentials.
    pub async fn ping(&self) -> Result<()> {
        let response = self
            .http
            .get(format!("{}/ping", self.base_url))
            .send()
            .await
            .map_err(|e| {
                SyncError::connection(format!("cannot reach ClickHouse at {}: {e}", self.base_url))
            })?;
        check_status(response, SyncError::Connection).await?;

        let body = self
            .send_query("SELECT 1", &[], SyncError::Connection)
            .await?
            .text()
            .await
            .map_err(|e| SyncError::connection(format!("failed to read handshake response: {e}")))?;
        if body.trim() != "1" {
            return Err(SyncError::connection(format!(
                "unexpected handshake response from {}: {:?}",
                self.base_url,
                body.trim()
            )));
        }

        debug!("Connected to ClickHouse at {}", self.base_url);
        Ok(())
    }

    /// Run a read query and return the whole response body. `params` are
    /// bound as `param_<name>` and referenced in `sql` as `{name:Type}`.
    pub async fn query_text(&self, sql: &str, params: &[(&str, &str)]) -> Result<String> {
        self.send_query(sql, params, SyncError::Query)
            .await?
            .text()
            .await
            .map_err(|e| SyncError::query(format!("failed to read query response: {e}")))
    }

    /// Run a read query and hand back the response for streaming.
    pub async fn query_stream(&self, sql: &str) -> Result<Response> {
        self.send_query(sql, &[], SyncError::Query).await
    }

    /// Run a statement that returns no rows, such as DDL.
    pub async fn execute(&self, sql: &str) -> Result<()> {
        self.send_query(sql, &[], SyncError::Write).await?;
        Ok(())
    }

    /// Send `data` as the body of `statement`, an `INSERT ... FORMAT` query.
    pub async fn insert(&self, statement: &str, data: String) -> Result<()> {
        let mut query: Vec<(&str, &str)> = WRITE_SETTINGS.to_vec();
        query.push(("query", statement));

        let response = self
            .request(Method::POST, "/")
            .query(&query)
            .body(data)
            .send()
            .await
            .map_err(|e| SyncError::write(format!("insert request failed: {e}")))?;
        check_status(response, SyncError::Write).await?;
        Ok(())
    }

    async fn send_query(
        &self,
        sql: &str,
        params: &[(&str, &str)],
        on_error: fn(String) -> SyncError,
    ) -> Result<Response> {
        let mut query: Vec<(String, String)> = READ_SETTINGS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        query.extend(
            params
                .iter()
                .map(|(name, value)| (format!("param_{name}"), value.to_string())),
        );

        debug!("ClickHouse query: {sql}");
        let response = self
            .request(Method::POST, "/")
            .query(&query)
            .body(sql.to_string())
            .send()
            .await
            .map_err(|e| {
                SyncError::connection(format!("cannot reach ClickHouse at {}: {e}", self.base_url))
            })?;
        check_status(response, on_error).await
    }
}

/// Rejected credentials are a connection failure; any other non-success
/// status becomes the error built by `on_error`, carrying the server message.
async fn check_status(response: Response, on_error: fn(String) -> SyncError) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("ClickHouse returned {status}: {}", body.trim());
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        Err(SyncError::connection(message))
    } else {
        Err(on_error(message))
    }
}
