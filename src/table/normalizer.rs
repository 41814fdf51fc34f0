//! JSON-to-table normalization
//!
//! Flattens nested JSON batches into a `Table`: nested object keys are joined
//! with a separator, and the array found at the record path becomes the rows.

use super::types::{parse_timestamp, RowBuilder, Table, Value};
use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue, RawBatch};
use tracing::debug;

/// Column name used for rows that are bare scalars rather than objects
const SCALAR_ROW_COLUMN: &str = "0";

/// Normalizer with configuration options
#[derive(Debug, Clone)]
pub struct BatchNormalizer {
    /// Separator joining nested keys
    separator: String,
    /// Nesting depth past which objects are kept whole (as JSON text)
    max_depth: Option<usize>,
    /// Parse timestamp-looking strings into timestamps
    detect_timestamps: bool,
}

impl Default for BatchNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchNormalizer {
    /// Create a normalizer with default settings
    pub fn new() -> Self {
        Self {
            separator: ".".to_string(),
            max_depth: None,
            detect_timestamps: true,
        }
    }

    /// Set the separator for nested keys
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Limit how deep nested objects are flattened
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Enable/disable timestamp detection
    #[must_use]
    pub fn with_timestamp_detection(mut self, enabled: bool) -> Self {
        self.detect_timestamps = enabled;
        self
    }

    /// Normalize one batch.
    ///
    /// With a record path the batch must be a mapping holding a list (or
    /// null) at that path. Without one, an object is a single row and an
    /// array is a list of rows.
    pub fn normalize(&self, batch: &RawBatch, record_path: Option<&str>) -> Result<Table> {
        let Some(path) = record_path else {
            return Ok(match batch {
                JsonValue::Array(rows) => self.normalize_records(rows),
                other => self.normalize_records(std::slice::from_ref(other)),
            });
        };

        let map = expect_mapping(batch, path)?;
        let records = lookup(map, path).ok_or_else(|| {
            Error::structure(path, "record path not present in batch")
        })?;

        match records {
            JsonValue::Array(rows) => Ok(self.normalize_records(rows)),
            JsonValue::Null => Ok(Table::new()),
            other => Err(Error::structure(
                path,
                format!("expected a list or null, found {}", json_kind(other)),
            )),
        }
    }

    /// Normalize batches sharing a record path and stack them row-wise.
    ///
    /// Batches lacking the key are skipped: that is how a page says "no data".
    pub fn normalize_all(&self, batches: &[RawBatch], record_path: &str) -> Result<Table> {
        let mut tables = Vec::with_capacity(batches.len());

        for (index, batch) in batches.iter().enumerate() {
            let map = expect_mapping(batch, record_path)?;
            if lookup(map, record_path).is_none() {
                debug!(batch = index, record_path, "Batch has no records, skipping");
                continue;
            }
            tables.push(self.normalize(batch, Some(record_path))?);
        }

        Ok(Table::concat(tables))
    }

    /// Normalize a list of row values
    pub fn normalize_records(&self, records: &[JsonValue]) -> Table {
        let mut builder = RowBuilder::new();
        let mut cells = Vec::new();

        for record in records {
            builder.start_row();
            match record {
                JsonValue::Object(map) => {
                    cells.clear();
                    self.flatten_into(None, map, 0, &mut cells);
                    for (name, value) in cells.drain(..) {
                        builder.set(&name, value);
                    }
                }
                other => builder.set(SCALAR_ROW_COLUMN, self.convert_scalar(other)),
            }
            builder.finish_row();
        }

        builder.build()
    }

    /// Convert a leaf JSON value to a cell
    pub fn convert_scalar(&self, value: &JsonValue) -> Value {
        match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Text(b.to_string()),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            JsonValue::String(s) => {
                if self.detect_timestamps {
                    if let Some(ts) = parse_timestamp(s) {
                        return Value::Timestamp(ts);
                    }
                }
                Value::Text(s.clone())
            }
            // Arrays, and objects past the depth limit, are kept whole
            JsonValue::Array(_) | JsonValue::Object(_) => Value::Text(value.to_string()),
        }
    }

    fn flatten_into(
        &self,
        prefix: Option<&str>,
        map: &JsonObject,
        depth: usize,
        out: &mut Vec<(String, Value)>,
    ) {
        for (key, value) in map {
            let name = match prefix {
                Some(prefix) => format!("{prefix}{}{key}", self.separator),
                None => key.clone(),
            };

            match value {
                JsonValue::Object(inner) if self.max_depth.map_or(true, |max| depth < max) => {
                    self.flatten_into(Some(&name), inner, depth + 1, out);
                }
                other => out.push((name, self.convert_scalar(other))),
            }
        }
    }
}

fn expect_mapping<'a>(batch: &'a RawBatch, path: &str) -> Result<&'a JsonObject> {
    batch.as_object().ok_or_else(|| {
        Error::structure(
            path,
            format!(
                "record path requires a mapping at the top level, found {}",
                json_kind(batch)
            ),
        )
    })
}

/// Follow a dotted path through nested objects
fn lookup<'a>(map: &'a JsonObject, path: &str) -> Option<&'a JsonValue> {
    let mut parts = path.split('.');
    let mut current = map.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
