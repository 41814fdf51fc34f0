//! Staged artifact writer
//!
//! Serializes a coerced table with the staging dialect. Quoting is decided
//! per value: numeric values and sentinels are written bare, everything else
//! (including the header) is quoted.

use super::dialect::StagingDialect;
use crate::error::Result;
use crate::table::{format_float, Table, Value};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, error};

/// Writes tables as delimited staging artifacts
#[derive(Debug, Clone, Default)]
pub struct CsvStager {
    dialect: StagingDialect,
}

impl CsvStager {
    /// Create a stager for a dialect
    pub fn new(dialect: StagingDialect) -> Self {
        Self { dialect }
    }

    /// Dialect in use
    pub fn dialect(&self) -> &StagingDialect {
        &self.dialect
    }

    /// Stage a table to `path`.
    ///
    /// Returns `false` after logging if the file could not be written; the
    /// caller decides what a partial pass means.
    pub fn stage(&self, table: &Table, path: &Path) -> bool {
        match self.write_file(table, path) {
            Ok(()) => {
                debug!(
                    path = %path.display(),
                    rows = table.num_rows(),
                    columns = table.num_columns(),
                    "Staged table"
                );
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to stage table");
                false
            }
        }
    }

    /// Write a table to a file, surfacing errors
    pub fn write_file(&self, table: &Table, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        self.write(table, &mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Write a table to any writer
    pub fn write<W: Write>(&self, table: &Table, out: W) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .delimiter(self.dialect.delimiter())
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(out);

        writer.write_record(table.column_names().into_iter().map(|name| self.quoted(name)))?;

        let mut record: Vec<Cow<'_, str>> = Vec::with_capacity(table.num_columns());
        for index in 0..table.num_rows() {
            record.clear();
            record.extend(
                table
                    .columns()
                    .iter()
                    .map(|column| self.field(&column.values()[index])),
            );
            writer.write_record(record.iter().map(|field| field.as_bytes()))?;
        }

        writer.flush()?;
        Ok(())
    }

    fn field<'a>(&'a self, value: &'a Value) -> Cow<'a, str> {
        match value {
            Value::Null => Cow::Borrowed(self.dialect.null_text()),
            Value::Sentinel(token) => Cow::Borrowed(token),
            Value::Integer(i) => Cow::Owned(i.to_string()),
            Value::Float(f) => Cow::Owned(format_float(*f)),
            Value::Timestamp(ts) => Cow::Owned(
                self.quoted(&ts.format(self.dialect.timestamp_format()).to_string()),
            ),
            Value::Text(text) => Cow::Owned(self.quoted(text)),
        }
    }

    fn quoted(&self, text: &str) -> String {
        let quote = char::from(self.dialect.quote());
        let mut escaped = String::with_capacity(text.len() + 2);
        escaped.push(quote);
        for c in text.chars() {
            if c == quote {
                escaped.push(quote);
            }
            escaped.push(c);
        }
        escaped.push(quote);
        escaped
    }
}
