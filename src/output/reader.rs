//! Staged artifact reader
//!
//! Parses an artifact back into a table using the staging dialect. Whether a
//! field was quoted decides its kind, so the fields are tokenized here rather
//! than through a CSV reader that discards that information.

use super::dialect::StagingDialect;
use crate::error::{Error, Result};
use crate::table::{Column, Table, Value};
use std::path::Path;

/// One raw field and whether it was quoted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Field {
    text: String,
    quoted: bool,
}

/// Reads staged artifacts
#[derive(Debug, Clone, Default)]
pub struct ArtifactReader {
    dialect: StagingDialect,
}

impl ArtifactReader {
    /// Create a reader for a dialect
    pub fn new(dialect: StagingDialect) -> Self {
        Self { dialect }
    }

    /// Read a staged file
    pub fn read(&self, path: &Path) -> Result<Table> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        self.parse(&content)
    }

    /// Parse artifact content.
    ///
    /// Quoted fields are text, except the timestamp-null sentinel which reads
    /// back as null. Bare fields are the null text, integers or floats.
    pub fn parse(&self, content: &str) -> Result<Table> {
        let mut records = self.tokenize(content)?.into_iter();
        let Some(header) = records.next() else {
            return Ok(Table::new());
        };

        let mut columns: Vec<Column> = header
            .into_iter()
            .map(|field| Column::new(field.text, Vec::new()))
            .collect();

        for (line, record) in records.enumerate() {
            if record.len() != columns.len() {
                return Err(Error::staging(format!(
                    "record {} has {} fields, header has {}",
                    line + 1,
                    record.len(),
                    columns.len()
                )));
            }
            for (column, field) in columns.iter_mut().zip(record) {
                column.values.push(self.value(field));
            }
        }

        Table::from_columns(columns)
    }

    fn value(&self, field: Field) -> Value {
        if field.quoted {
            if field.text == self.dialect.timestamp_null() {
                return Value::Null;
            }
            return Value::Text(field.text);
        }

        if field.text == self.dialect.null_text() {
            return Value::Null;
        }
        if let Ok(i) = field.text.parse::<i64>() {
            return Value::Integer(i);
        }
        if field.text.bytes().any(|b| b.is_ascii_digit()) {
            if let Ok(f) = field.text.parse::<f64>() {
                return Value::Float(f);
            }
        }
        Value::Text(field.text)
    }

    fn tokenize(&self, content: &str) -> Result<Vec<Vec<Field>>> {
        let delimiter = char::from(self.dialect.delimiter());
        let quote = char::from(self.dialect.quote());

        let mut records = Vec::new();
        let mut record = Vec::new();
        let mut field = Field::default();
        let mut in_quotes = false;
        let mut chars = content.chars().peekable();

        while let Some(c) = chars.next() {
            if in_quotes {
                if c == quote {
                    if chars.peek() == Some(&quote) {
                        chars.next();
                        field.text.push(quote);
                    } else {
                        in_quotes = false;
                    }
                } else {
                    field.text.push(c);
                }
                continue;
            }

            match c {
                c if c == quote && field.text.is_empty() && !field.quoted => {
                    field.quoted = true;
                    in_quotes = true;
                }
                c if c == delimiter => record.push(std::mem::take(&mut field)),
                '\n' => {
                    record.push(std::mem::take(&mut field));
                    records.push(std::mem::take(&mut record));
                }
                c => field.text.push(c),
            }
        }

        if in_quotes {
            return Err(Error::staging("unterminated quoted field"));
        }
        if !field.text.is_empty() || field.quoted || !record.is_empty() {
            record.push(field);
            records.push(record);
        }

        Ok(records)
    }
}
