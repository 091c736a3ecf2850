//! Per-request configuration.
//!
//! Every API call carries a complete configuration; nothing here is cached or
//! merged across requests. Field names follow the JSON bodies accepted by the
//! HTTP API (`fileName`, `batchSize`, ...).

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::identifier::quote_table;
use crate::schema::validate_column_list;

/// Default ClickHouse HTTP port.
pub const DEFAULT_HTTP_PORT: u16 = 8123;

/// Default ClickHouse HTTPS port.
pub const DEFAULT_HTTPS_PORT: u16 = 8443;

/// Default database when none is configured.
pub const DEFAULT_DATABASE: &str = "default";

/// Kind of endpoint on either side of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "ClickHouse", alias = "clickhouse", alias = "Clickhouse")]
    ClickHouse,

    #[serde(
        rename = "Flat File",
        alias = "flatfile",
        alias = "FlatFile",
        alias = "file"
    )]
    FlatFile,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::ClickHouse => f.write_str("ClickHouse"),
            SourceKind::FlatFile => f.write_str("Flat File"),
        }
    }
}

/// Connection settings for the ClickHouse HTTP interface.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickHouseConnection {
    /// Host name, optionally with an `http://` or `https://` scheme
    #[serde(default)]
    pub host: String,

    /// HTTP port; accepts a JSON string or number
    #[serde(default, deserialize_with = "deserialize_port")]
    pub port: Option<u16>,

    /// Database name
    #[serde(default)]
    pub database: String,

    /// User name
    #[serde(default)]
    pub user: String,

    /// Password or JWT sent as the ClickHouse key
    #[serde(default)]
    pub jwt: String,

    /// Use HTTPS
    #[serde(default)]
    pub secure: bool,
}

impl ClickHouseConnection {
    /// Base URL of the HTTP interface, e.g. `http://localhost:8123`.
    pub fn base_url(&self) -> Result<String> {
        let host = self.host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(SyncError::config("ClickHouse host must not be empty"));
        }

        let (scheme, bare_host) = if let Some(rest) = host.strip_prefix("https://") {
            ("https", rest)
        } else if let Some(rest) = host.strip_prefix("http://") {
            ("http", rest)
        } else if self.secure {
            ("https", host)
        } else {
            ("http", host)
        };

        if bare_host.contains(':') {
            if self.port.is_some() {
                return Err(SyncError::config(format!(
                    "host {bare_host:?} already contains a port"
                )));
            }
            return Ok(format!("{scheme}://{bare_host}"));
        }

        let port = self.port.unwrap_or(if scheme == "https" {
            DEFAULT_HTTPS_PORT
        } else {
            DEFAULT_HTTP_PORT
        });
        Ok(format!("{scheme}://{bare_host}:{port}"))
    }

    /// Configured database, falling back to `default`.
    pub fn database_or_default(&self) -> &str {
        let database = self.database.trim();
        if database.is_empty() {
            DEFAULT_DATABASE
        } else {
            database
        }
    }

    /// Configured user, falling back to `default`.
    pub fn user_or_default(&self) -> &str {
        let user = self.user.trim();
        if user.is_empty() {
            "default"
        } else {
            user
        }
    }
}

impl fmt::Debug for ClickHouseConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClickHouseConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("jwt", &if self.jwt.is_empty() { "" } else { "<redacted>" })
            .field("secure", &self.secure)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortRepr {
    Number(u16),
    Text(String),
}

fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<PortRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(PortRepr::Number(port)) => Ok(Some(port)),
        Some(PortRepr::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(PortRepr::Text(text)) => text
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid port {text:?}"))),
    }
}

/// Validate a flat-file delimiter: exactly one ASCII character that is not a
/// quote or line terminator.
pub fn parse_delimiter(delimiter: &str) -> Result<u8> {
    let mut chars = delimiter.chars();
    let c = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        (None, _) => return Err(SyncError::config("delimiter must not be empty")),
        _ => {
            return Err(SyncError::config(format!(
                "delimiter must be exactly one character, got {delimiter:?}"
            )))
        }
    };

    if !c.is_ascii() || matches!(c, '"' | '\n' | '\r') {
        return Err(SyncError::config(format!(
            "unsupported delimiter {delimiter:?}"
        )));
    }
    Ok(c as u8)
}

/// Configuration for `/connect` and `/schemas`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Which kind of endpoint this configuration describes
    pub source: SourceKind,

    /// Database connection settings (ignored for flat files)
    #[serde(flatten)]
    pub connection: ClickHouseConnection,

    /// Flat file path (ignored for ClickHouse)
    #[serde(default)]
    pub file_name: String,

    /// Flat file delimiter (ignored for ClickHouse)
    #[serde(default)]
    pub delimiter: String,
}

/// A transfer request for `/ingest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    /// Source endpoint kind
    pub source: SourceKind,

    /// Sink endpoint kind
    pub target: SourceKind,

    /// Database table on the ClickHouse side
    #[serde(default)]
    pub table: String,

    /// Explicit ordered column list
    #[serde(default)]
    pub columns: Vec<String>,

    /// File path on the flat-file side
    #[serde(default)]
    pub file_name: String,

    /// Delimiter on the flat-file side
    #[serde(default)]
    pub delimiter: String,

    /// Database connection settings for the ClickHouse side
    #[serde(flatten)]
    pub connection: ClickHouseConnection,

    /// Rows per batch; the server default applies when absent
    #[serde(default)]
    pub batch_size: Option<usize>,
}

impl IngestRequest {
    /// Check every caller-supplied field before any I/O.
    pub fn validate(&self) -> Result<()> {
        if self.source == self.target {
            return Err(SyncError::config(format!(
                "source and target must differ, both are {}",
                self.source
            )));
        }

        validate_column_list(&self.columns)?;

        if self.batch_size == Some(0) {
            return Err(SyncError::config("batchSize must be a positive integer"));
        }

        if self.file_name.trim().is_empty() {
            return Err(SyncError::config("fileName must not be empty"));
        }
        parse_delimiter(&self.delimiter)?;

        quote_table(&self.table)?;
        for column in &self.columns {
            crate::identifier::validate_identifier(column)?;
        }
        self.connection.base_url()?;

        Ok(())
    }

    /// Name of the table or file addressed on the given side.
    pub fn object_name(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::ClickHouse => &self.table,
            SourceKind::FlatFile => &self.file_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingest_json() -> serde_json::Value {
        serde_json::json!({
            "source": "ClickHouse",
            "target": "Flat File",
            "table": "test_table",
            "columns": ["id", "price"],
            "fileName": "out.csv",
            "delimiter": ",",
            "host": "localhost",
            "port": "8123",
            "database": "default",
            "user": "default",
            "jwt": "secret"
        })
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("\t").unwrap(), b'\t');
        assert!(matches!(parse_delimiter(""), Err(SyncError::Config(_))));
        assert!(matches!(parse_delimiter(",,"), Err(SyncError::Config(_))));
        assert!(matches!(parse_delimiter("§"), Err(SyncError::Config(_))));
        assert!(matches!(parse_delimiter("\""), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_config_deserialization() {
        let cfg: Config = serde_json::from_value(serde_json::json!({
            "source": "Flat File",
            "fileName": "data.csv",
            "delimiter": ";"
        }))
        .unwrap();
        assert_eq!(cfg.source, SourceKind::FlatFile);
        assert_eq!(cfg.file_name, "data.csv");
        assert_eq!(cfg.connection.port, None);

        let cfg: Config = serde_json::from_value(serde_json::json!({
            "source": "clickhouse",
            "host": "db",
            "port": 9000
        }))
        .unwrap();
        assert_eq!(cfg.source, SourceKind::ClickHouse);
        assert_eq!(cfg.connection.port, Some(9000));
        assert_eq!(cfg.connection.database_or_default(), "default");
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result: std::result::Result<Config, _> = serde_json::from_value(serde_json::json!({
            "source": "ClickHouse",
            "host": "db",
            "port": "http"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_base_url() {
        let mut conn = ClickHouseConnection {
            host: "localhost".to_string(),
            ..Default::default()
        };
        assert_eq!(conn.base_url().unwrap(), "http://localhost:8123");

        conn.secure = true;
        assert_eq!(conn.base_url().unwrap(), "https://localhost:8443");

        conn.host = "http://ch.internal/".to_string();
        conn.port = Some(18123);
        assert_eq!(conn.base_url().unwrap(), "http://ch.internal:18123");

        conn.host = "127.0.0.1:9999".to_string();
        conn.port = None;
        conn.secure = false;
        assert_eq!(conn.base_url().unwrap(), "http://127.0.0.1:9999");

        conn.host = String::new();
        assert!(matches!(conn.base_url(), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_credential() {
        let conn = ClickHouseConnection {
            host: "localhost".to_string(),
            jwt: "top-secret".to_string(),
            ..Default::default()
        };
        let rendered = format!("{conn:?}");
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_ingest_request_validate() {
        let req: IngestRequest = serde_json::from_value(ingest_json()).unwrap();
        req.validate().unwrap();
        assert_eq!(req.object_name(SourceKind::ClickHouse), "test_table");
        assert_eq!(req.object_name(SourceKind::FlatFile), "out.csv");
        assert_eq!(req.connection.jwt, "secret");
    }

    #[test]
    fn test_ingest_request_rejections() {
        let cases = [
            ("target", serde_json::json!("ClickHouse")),
            ("columns", serde_json::json!([])),
            ("columns", serde_json::json!(["id", "id"])),
            ("delimiter", serde_json::json!("")),
            ("table", serde_json::json!("t; DROP TABLE x")),
            ("columns", serde_json::json!(["id", "pri ce"])),
            ("batchSize", serde_json::json!(0)),
            ("fileName", serde_json::json!("")),
            ("host", serde_json::json!("")),
        ];

        for (field, value) in cases {
            let mut body = ingest_json();
            body[field] = value;
            let req: IngestRequest = serde_json::from_value(body).unwrap();
            assert!(
                matches!(req.validate(), Err(SyncError::Config(_))),
                "expected config error for {field}"
            );
        }
    }
}
