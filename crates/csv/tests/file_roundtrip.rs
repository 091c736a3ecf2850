//! Flat-file endpoint driven through the `Endpoint` trait.

use bridge_csv::FileEndpoint;
use chrono::{TimeZone, Utc};
use csv_types::infer_field_value;
use sync_core::{ColumnValue, Endpoint, Row, SyncError};
use tempfile::TempDir;

fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_write_then_read_through_endpoint() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("people.csv");
    let path = path.to_str().unwrap().to_string();

    let endpoint = FileEndpoint::new(path.clone(), ";").unwrap();
    let columns = cols(&["id", "name", "score", "active", "seen_at"]);
    let seen = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();

    let rows: Vec<Row> = vec![
        vec![
            ColumnValue::Int64(1),
            ColumnValue::text("Alice; Jr."),
            ColumnValue::Float64(3.25),
            ColumnValue::Bool(true),
            ColumnValue::Timestamp(seen),
        ],
        vec![
            ColumnValue::Int64(2),
            ColumnValue::text("Bob"),
            ColumnValue::Null,
            ColumnValue::Bool(false),
            ColumnValue::Null,
        ],
    ];

    let mut writer = endpoint.open_writer(&path, &columns).await.unwrap();
    assert_eq!(writer.write_batch(rows.clone()).await.unwrap(), 2);
    writer.close().await.unwrap();

    endpoint.check().await.unwrap();
    let schemas = endpoint.discover().await.unwrap();
    assert_eq!(schemas.len(), 1);
    assert_eq!(schemas[0].table, path);
    assert_eq!(schemas[0].columns, columns);

    let mut reader = endpoint.open_reader(&path, &columns).await.unwrap();
    let mut read_back = Vec::new();
    while let Some(row) = reader.next_row().await.unwrap() {
        read_back.push(row);
    }
    reader.close().await.unwrap();

    // Fields come back as written; guessing recovers the original types
    let rendered: Vec<Vec<String>> = read_back
        .iter()
        .map(|row| row.iter().map(ColumnValue::render_text).collect())
        .collect();
    let expected: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(ColumnValue::render_text).collect())
        .collect();
    assert_eq!(rendered, expected);

    let guessed: Vec<Row> = read_back
        .iter()
        .map(|row| row.iter().map(infer_field_value).collect())
        .collect();
    assert_eq!(guessed, rows);
}

#[tokio::test]
async fn test_failed_read_keeps_earlier_rows_countable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.csv");
    std::fs::write(&path, "a,b\n1,2\n3,4\n5,6,7\n").unwrap();
    let path = path.to_str().unwrap();

    let endpoint = FileEndpoint::new(path, ",").unwrap();
    let mut reader = endpoint.open_reader(path, &cols(&["b"])).await.unwrap();

    assert_eq!(
        reader.next_row().await.unwrap(),
        Some(vec![ColumnValue::text("2")])
    );
    assert_eq!(
        reader.next_row().await.unwrap(),
        Some(vec![ColumnValue::text("4")])
    );
    let err = reader.next_row().await.unwrap_err();
    assert!(matches!(err, SyncError::Format(_)));
}
