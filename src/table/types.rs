//! Table types
//!
//! A `Table` is an ordered list of named columns of equal length. Values are
//! runtime-typed scalars; a column may hold several kinds until the coercer
//! has run over it.

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use chrono::{DateTime, NaiveDateTime};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Loose shape check run before attempting a full timestamp parse
static TIMESTAMP_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}").unwrap());

/// Lexical form used when timestamps are written back out as JSON
const JSON_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Runtime kind of a non-null scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScalarKind {
    Integer,
    Float,
    Timestamp,
    Text,
}

impl std::fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarKind::Integer => write!(f, "integer"),
            ScalarKind::Float => write!(f, "float"),
            ScalarKind::Timestamp => write!(f, "timestamp"),
            ScalarKind::Text => write!(f, "text"),
        }
    }
}

/// A single cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Text(String),
    /// Pre-rendered token written verbatim and unquoted. Carries no kind,
    /// so it never makes a column look mixed.
    Sentinel(String),
}

impl Value {
    /// Kind of this value; `None` for nulls and sentinels
    pub fn kind(&self) -> Option<ScalarKind> {
        match self {
            Value::Null | Value::Sentinel(_) => None,
            Value::Integer(_) => Some(ScalarKind::Integer),
            Value::Float(_) => Some(ScalarKind::Float),
            Value::Timestamp(_) => Some(ScalarKind::Timestamp),
            Value::Text(_) => Some(ScalarKind::Text),
        }
    }

    /// Check for a real null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text payload, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render as plain text, `None` for nulls
    pub fn render(&self, timestamp_format: &str) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(format_float(*f)),
            Value::Timestamp(ts) => Some(ts.format(timestamp_format).to_string()),
            Value::Text(s) | Value::Sentinel(s) => Some(s.clone()),
        }
    }

    /// Convert to JSON for landing files
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Integer(i) => JsonValue::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(JsonValue::Null, JsonValue::Number),
            Value::Timestamp(ts) => {
                JsonValue::String(ts.format(JSON_TIMESTAMP_FORMAT).to_string())
            }
            Value::Text(s) | Value::Sentinel(s) => JsonValue::String(s.clone()),
        }
    }
}

/// Shortest representation that parses back to the same float and always
/// carries a fractional part or exponent, so it never reads back as an integer.
pub fn format_float(value: f64) -> String {
    format!("{value:?}")
}

/// Parse a timestamp-looking string. Date-only strings are not timestamps.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if !TIMESTAMP_SHAPE.is_match(s) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// A named column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name
    pub name: String,
    pub(crate) values: Vec<Value>,
}

impl Column {
    /// Create a new column
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Column values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Mutable access that cannot change the column length
    pub fn values_mut(&mut self) -> &mut [Value] {
        &mut self.values
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the column has no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered columns of equal length
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from columns, checking they all have the same length
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let num_rows = columns.first().map_or(0, Column::len);
        for column in &columns {
            if column.len() != num_rows {
                return Err(Error::RowCount {
                    column: column.name.clone(),
                    expected: num_rows,
                    actual: column.len(),
                });
            }
        }
        Ok(Self { columns, num_rows })
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// All columns in order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Mutable columns; the slice keeps the column set fixed
    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Append a column; a table without columns adopts the column's length
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.columns.is_empty() && self.num_rows == 0 {
            self.num_rows = column.len();
        } else if column.len() != self.num_rows {
            return Err(Error::RowCount {
                column: column.name,
                expected: self.num_rows,
                actual: column.values.len(),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    /// Append a column holding the same value on every row
    pub fn push_constant(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        let values = vec![value; self.num_rows];
        self.push_column(Column::new(name, values))
    }

    /// Values of one row, in column order
    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }

    /// Stack tables row-wise with column union semantics.
    ///
    /// Columns keep first-seen order; rows from a table lacking a column get
    /// null for it.
    pub fn concat(tables: Vec<Table>) -> Table {
        let mut builder = RowBuilder::new();
        for table in tables {
            for index in 0..table.num_rows {
                builder.start_row();
                for column in &table.columns {
                    builder.set(&column.name, column.values[index].clone());
                }
                builder.finish_row();
            }
            // Keep zero-row tables' columns in the union
            for column in &table.columns {
                builder.ensure_column(&column.name);
            }
        }
        builder.build()
    }

    /// Flat JSON records, one per row, for landing files
    pub fn to_records(&self) -> Vec<JsonObject> {
        (0..self.num_rows)
            .map(|index| {
                self.columns
                    .iter()
                    .map(|c| (c.name.clone(), c.values[index].to_json()))
                    .collect()
            })
            .collect()
    }
}

/// Row-at-a-time table construction with column union semantics
#[derive(Debug, Default)]
pub(crate) struct RowBuilder {
    index: HashMap<String, usize>,
    columns: Vec<Column>,
    num_rows: usize,
}

impl RowBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Begin a new row; every column is padded with null until set
    pub(crate) fn start_row(&mut self) {
        for column in &mut self.columns {
            column.values.push(Value::Null);
        }
        self.num_rows += 1;
    }

    /// Set a cell of the current row; a repeated name overwrites
    pub(crate) fn set(&mut self, name: &str, value: Value) {
        let position = self.ensure_column(name);
        if let Some(last) = self.columns[position].values.last_mut() {
            *last = value;
        }
    }

    /// Make sure a column exists, backfilled with nulls
    pub(crate) fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(&position) = self.index.get(name) {
            return position;
        }
        let position = self.columns.len();
        self.columns
            .push(Column::new(name, vec![Value::Null; self.num_rows]));
        self.index.insert(name.to_string(), position);
        position
    }

    pub(crate) fn finish_row(&mut self) {
        debug_assert!(self.columns.iter().all(|c| c.len() == self.num_rows));
    }

    pub(crate) fn build(self) -> Table {
        Table {
            columns: self.columns,
            num_rows: self.num_rows,
        }
    }
}
