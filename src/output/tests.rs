//! Output tests

use super::*;
use crate::coerce::TypeCoercer;
use crate::table::{Column, Table, Value};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn render(table: &Table) -> String {
    let mut out = Vec::new();
    CsvStager::default().write(table, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn sample() -> Table {
    let seen = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap();
    Table::from_columns(vec![
        Column::new("id", vec![Value::Integer(7), Value::Null, Value::Integer(-1)]),
        Column::new("ratio", vec![Value::Float(0.5), Value::Integer(2), Value::Null]),
        Column::new("ts", vec![Value::Timestamp(seen), Value::Null, Value::Null]),
        Column::new("note", vec![text("a\tb"), Value::Null, text("x~y")]),
        Column::new("mixed", vec![Value::Integer(1), text("one"), Value::Null]),
    ])
    .unwrap()
}

/// Expected read-back of a coerced table: sentinels become nulls
fn canonical(mut table: Table, dialect: &StagingDialect) -> Table {
    for column in table.columns_mut() {
        for value in column.values_mut() {
            let is_null = match &*value {
                Value::Sentinel(token) => token == dialect.null_text(),
                Value::Text(s) => s == dialect.timestamp_null(),
                _ => false,
            };
            if is_null {
                *value = Value::Null;
            }
        }
    }
    table
}

// ============================================================================
// Writer Tests
// ============================================================================

#[test]
fn test_dialect_defaults() {
    let dialect = StagingDialect::new();
    assert_eq!(dialect.delimiter(), b'~');
    assert_eq!(dialect.quote(), b'"');
    assert_eq!(dialect.null_text(), "NULL");
    assert_eq!(dialect.timestamp_null(), "0001-01-01 00:00:00.000");
}

#[test]
fn test_write_quotes_non_numeric() {
    let mut table = sample();
    TypeCoercer::new(StagingDialect::new())
        .coerce(&mut table)
        .unwrap();

    let expected = concat!(
        "\"id\"~\"ratio\"~\"ts\"~\"note\"~\"mixed\"\n",
        "7~0.5~\"2024-01-02 03:04:05.000000\"~\"ab\"~\"1\"\n",
        "NULL~2.0~\"0001-01-01 00:00:00.000\"~NULL~\"one\"\n",
        "-1~NULL~\"0001-01-01 00:00:00.000\"~\"x~y\"~NULL\n",
    );
    assert_eq!(render(&table), expected);
}

#[test]
fn test_write_doubles_embedded_quotes() {
    let table = Table::from_columns(vec![Column::new("q", vec![text(r#"say "hi""#)])]).unwrap();
    assert_eq!(render(&table), "\"q\"\n\"say \"\"hi\"\"\"\n");
}

#[test]
fn test_write_header_only_for_empty_table() {
    let table = Table::from_columns(vec![Column::new("a", vec![])]).unwrap();
    assert_eq!(render(&table), "\"a\"\n");
}

#[test]
fn test_stage_reports_failure_without_panicking() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("out.csv");
    assert!(!CsvStager::default().stage(&sample(), &path));
}

#[test]
fn test_stage_writes_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");
    assert!(CsvStager::default().stage(&sample(), &path));
    assert!(std::fs::read_to_string(&path).unwrap().starts_with("\"id\"~"));
}

// ============================================================================
// Reader Tests
// ============================================================================

#[test]
fn test_read_back_coerced_table() {
    let dialect = StagingDialect::new();
    let mut table = sample();
    TypeCoercer::new(dialect.clone())
        .coerce(&mut table)
        .unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.csv");
    assert!(CsvStager::new(dialect.clone()).stage(&table, &path));

    let reread = ArtifactReader::new(dialect.clone()).read(&path).unwrap();

    assert_eq!(reread.num_rows(), table.num_rows());
    assert_eq!(reread, canonical(table, &dialect));
}

#[test]
fn test_read_distinguishes_quoted_numbers() {
    let table = ArtifactReader::default()
        .parse("\"a\"~\"b\"~\"c\"\n12~\"12\"~\"NULL\"\n")
        .unwrap();
    assert_eq!(
        table.row(0),
        vec![&Value::Integer(12), &text("12"), &text("NULL")]
    );
}

#[test]
fn test_read_rejects_ragged_records() {
    let err = ArtifactReader::default()
        .parse("\"a\"~\"b\"\n1\n")
        .unwrap_err();
    assert!(err.to_string().contains("record 1 has 1 fields"));
}

#[test]
fn test_read_rejects_unterminated_quote() {
    assert!(ArtifactReader::default().parse("\"a\"\n\"open\n").is_err());
}

#[test]
fn test_read_missing_file() {
    let err = ArtifactReader::default()
        .read(std::path::Path::new("/nonexistent/out.csv"))
        .unwrap_err();
    assert!(matches!(err, crate::error::Error::FileNotFound { .. }));
}

#[test]
fn test_read_empty_content() {
    let table = ArtifactReader::default().parse("").unwrap();
    assert_eq!(table.num_columns(), 0);
}
