//! In-process stand-in for the ClickHouse HTTP interface.
//!
//! Understands exactly the statements the bridge sends: the `SELECT 1`
//! handshake, catalog queries on `system.tables` / `system.columns`,
//! `CREATE TABLE IF NOT EXISTS`, streaming `SELECT ... FORMAT
//! JSONCompactEachRowWithNamesAndTypes` and `INSERT ... FORMAT
//! JSONCompactEachRow`. Tables live in memory as JSON cells.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::Value as JsonValue;
use sync_core::ClickHouseConnection;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Database every mock table lives in.
pub const MOCK_DATABASE: &str = "default";

/// Key the mock accepts in `X-ClickHouse-Key`.
pub const MOCK_KEY: &str = "test-jwt";

#[derive(Debug, Clone, Default)]
pub struct MockTable {
    /// `(name, type)` in declared order
    pub columns: Vec<(String, String)>,
    pub rows: Vec<Vec<JsonValue>>,
}

#[derive(Debug, Default)]
struct MockState {
    tables: BTreeMap<String, MockTable>,
    statements: Vec<String>,
    insert_requests: usize,
    fail_inserts_after: Option<usize>,
    failing_column_listings: Vec<String>,
}

type SharedState = Arc<Mutex<MockState>>;

/// A running mock server. The server task is aborted on drop.
pub struct MockClickHouse {
    addr: SocketAddr,
    state: SharedState,
    handle: JoinHandle<()>,
}

impl MockClickHouse {
    /// Bind on `127.0.0.1:0` and start serving.
    pub async fn start() -> std::io::Result<Self> {
        let state: SharedState = Arc::default();
        let app = Router::new()
            .route("/ping", get(|| async { "Ok.\n" }))
            .route("/", post(handle_query))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Connection settings pointing at this server.
    pub fn connection(&self) -> ClickHouseConnection {
        ClickHouseConnection {
            host: self.addr.ip().to_string(),
            port: Some(self.addr.port()),
            database: MOCK_DATABASE.to_string(),
            user: "default".to_string(),
            jwt: MOCK_KEY.to_string(),
            secure: false,
        }
    }

    pub fn add_table(&self, name: &str, columns: &[(&str, &str)], rows: Vec<Vec<JsonValue>>) {
        let table = MockTable {
            columns: columns
                .iter()
                .map(|(n, t)| (n.to_string(), t.to_string()))
                .collect(),
            rows,
        };
        self.lock().tables.insert(name.to_string(), table);
    }

    pub fn table(&self, name: &str) -> Option<MockTable> {
        self.lock().tables.get(name).cloned()
    }

    /// Every statement received, in arrival order.
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    pub fn insert_requests(&self) -> usize {
        self.lock().insert_requests
    }

    /// Reject every insert request after the first `n`.
    pub fn fail_inserts_after(&self, n: usize) {
        self.lock().fail_inserts_after = Some(n);
    }

    /// Fail every `system.columns` query for `table`.
    pub fn fail_column_listing(&self, table: &str) {
        self.lock().failing_column_listings.push(table.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for MockClickHouse {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn exception(status: StatusCode, code: u32, message: &str) -> Response {
    (status, format!("Code: {code}. DB::Exception: {message}\n")).into_response()
}

async fn handle_query(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let key = headers
        .get("X-ClickHouse-Key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if key != MOCK_KEY {
        return exception(
            StatusCode::FORBIDDEN,
            516,
            "default: Authentication failed. (AUTHENTICATION_FAILED)",
        );
    }

    let body = String::from_utf8_lossy(&body).into_owned();
    let mut state = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(statement) = params.get("query") {
        state.statements.push(statement.clone());
        return handle_insert(&mut state, statement, &body);
    }

    let sql = body.trim().to_string();
    state.statements.push(sql.clone());

    if sql == "SELECT 1" {
        return "1\n".into_response();
    }
    if sql.contains("FROM system.tables") {
        return list_tables(&state, &params);
    }
    if sql.contains("FROM system.columns") {
        return list_columns(&state, &params);
    }
    if let Some(rest) = sql.strip_prefix("CREATE TABLE IF NOT EXISTS ") {
        return create_table(&mut state, rest);
    }
    if let Some(rest) = sql.strip_prefix("SELECT ") {
        return select(&state, rest);
    }

    exception(
        StatusCode::BAD_REQUEST,
        62,
        &format!("Syntax error: unsupported statement {sql:?}. (SYNTAX_ERROR)"),
    )
}

fn unquote(identifier: &str) -> String {
    let name = identifier.trim().replace('`', "");
    match name.split_once('.') {
        Some((_, table)) => table.to_string(),
        None => name,
    }
}

fn unknown_table(name: &str) -> Response {
    exception(
        StatusCode::NOT_FOUND,
        60,
        &format!("Table {MOCK_DATABASE}.{name} does not exist. (UNKNOWN_TABLE)"),
    )
}

fn json_lines(rows: impl IntoIterator<Item = JsonValue>) -> String {
    rows.into_iter().map(|row| format!("{row}\n")).collect()
}

fn list_tables(state: &MockState, params: &HashMap<String, String>) -> Response {
    if params.get("param_db").map(String::as_str) != Some(MOCK_DATABASE) {
        return String::new().into_response();
    }
    json_lines(state.tables.keys().map(|name| JsonValue::from(vec![name.clone()])))
        .into_response()
}

fn list_columns(state: &MockState, params: &HashMap<String, String>) -> Response {
    if let Some(name) = params.get("param_table") {
        if state.failing_column_listings.contains(name) {
            return exception(
                StatusCode::INTERNAL_SERVER_ERROR,
                159,
                "Timeout exceeded: elapsed 5.0 seconds. (TIMEOUT_EXCEEDED)",
            );
        }
    }

    let table = params
        .get("param_table")
        .and_then(|name| state.tables.get(name));
    match table {
        Some(table) if params.get("param_db").map(String::as_str) == Some(MOCK_DATABASE) => {
            json_lines(
                table
                    .columns
                    .iter()
                    .map(|(n, t)| JsonValue::from(vec![n.clone(), t.clone()])),
            )
            .into_response()
        }
        _ => String::new().into_response(),
    }
}

/// Split on commas that are not nested inside parentheses.
fn split_top_level(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn create_table(state: &mut MockState, rest: &str) -> Response {
    let (Some(open), Some(close)) = (rest.find('('), rest.rfind(") ENGINE")) else {
        return exception(StatusCode::BAD_REQUEST, 62, "Syntax error in CREATE TABLE");
    };
    let name = unquote(&rest[..open]);
    if state.tables.contains_key(&name) {
        return String::new().into_response();
    }

    let columns = split_top_level(&rest[open + 1..close])
        .into_iter()
        .filter_map(|definition| {
            let (column, ty) = definition.split_once(' ')?;
            Some((unquote(column), ty.trim().to_string()))
        })
        .collect();
    state.tables.insert(
        name,
        MockTable {
            columns,
            rows: Vec::new(),
        },
    );
    String::new().into_response()
}

fn select(state: &MockState, rest: &str) -> Response {
    let Some((column_list, from)) = rest.split_once(" FROM ") else {
        return exception(StatusCode::BAD_REQUEST, 62, "Syntax error in SELECT");
    };
    let Some((table_name, format)) = from.split_once(" FORMAT ") else {
        return exception(StatusCode::BAD_REQUEST, 62, "Syntax error in SELECT");
    };
    if format.trim() != "JSONCompactEachRowWithNamesAndTypes" {
        return exception(StatusCode::BAD_REQUEST, 73, "Unknown format");
    }

    let name = unquote(table_name);
    let Some(table) = state.tables.get(&name) else {
        return unknown_table(&name);
    };

    let mut indices = Vec::new();
    for column in column_list.split(',').map(unquote) {
        match table.columns.iter().position(|(n, _)| *n == column) {
            Some(i) => indices.push(i),
            None => {
                return exception(
                    StatusCode::NOT_FOUND,
                    47,
                    &format!("Missing columns: '{column}'. (UNKNOWN_IDENTIFIER)"),
                )
            }
        }
    }

    let names: Vec<JsonValue> = indices
        .iter()
        .map(|&i| JsonValue::from(table.columns[i].0.clone()))
        .collect();
    let types: Vec<JsonValue> = indices
        .iter()
        .map(|&i| JsonValue::from(table.columns[i].1.clone()))
        .collect();
    let rows = table.rows.iter().map(|row| {
        JsonValue::Array(
            indices
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or(JsonValue::Null))
                .collect(),
        )
    });

    let mut lines = vec![JsonValue::Array(names), JsonValue::Array(types)];
    lines.extend(rows);
    json_lines(lines).into_response()
}

fn handle_insert(state: &mut MockState, statement: &str, data: &str) -> Response {
    if let Some(limit) = state.fail_inserts_after {
        if state.insert_requests >= limit {
            return exception(
                StatusCode::INTERNAL_SERVER_ERROR,
                241,
                "Memory limit (total) exceeded. (MEMORY_LIMIT_EXCEEDED)",
            );
        }
    }

    let Some(rest) = statement.strip_prefix("INSERT INTO ") else {
        return exception(StatusCode::BAD_REQUEST, 62, "Syntax error in INSERT");
    };
    let (Some(open), Some(close)) = (rest.find('('), rest.find(')')) else {
        return exception(StatusCode::BAD_REQUEST, 62, "Syntax error in INSERT");
    };
    let name = unquote(&rest[..open]);
    let columns: Vec<String> = rest[open + 1..close].split(',').map(unquote).collect();

    let Some(table) = state.tables.get(&name) else {
        return unknown_table(&name);
    };
    let mut positions = Vec::new();
    for column in &columns {
        match table.columns.iter().position(|(n, _)| n == column) {
            Some(i) => positions.push(i),
            None => {
                return exception(
                    StatusCode::BAD_REQUEST,
                    16,
                    &format!("No such column {column} in table {name}. (NO_SUCH_COLUMN_IN_TABLE)"),
                )
            }
        }
    }
    let width = table.columns.len();

    let mut parsed = Vec::new();
    for line in data.lines().filter(|l| !l.trim().is_empty()) {
        let cells: Vec<JsonValue> = match serde_json::from_str(line) {
            Ok(cells) => cells,
            Err(e) => {
                return exception(
                    StatusCode::BAD_REQUEST,
                    117,
                    &format!("Cannot parse input: {e}. (INCORRECT_DATA)"),
                )
            }
        };
        if cells.len() != columns.len() {
            return exception(StatusCode::BAD_REQUEST, 117, "Wrong number of values");
        }
        let mut row = vec![JsonValue::Null; width];
        for (cell, &i) in cells.into_iter().zip(&positions) {
            row[i] = cell;
        }
        parsed.push(row);
    }

    state.insert_requests += 1;
    if let Some(table) = state.tables.get_mut(&name) {
        table.rows.extend(parsed);
    }
    String::new().into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level("`id` Int64, `at` DateTime64(6, 'UTC'), `n` Nullable(String)"),
            vec!["`id` Int64", "`at` DateTime64(6, 'UTC')", "`n` Nullable(String)"]
        );
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(" `default`.`orders` "), "orders");
        assert_eq!(unquote("`price`"), "price");
    }
}
