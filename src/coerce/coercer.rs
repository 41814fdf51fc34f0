//! Type coercion
//!
//! Rewrites each column of a table to a single kind and the canonical
//! lexical forms of the staging dialect.

use super::profile::{ColumnKind, ColumnProfile};
use crate::error::{Error, Result};
use crate::output::StagingDialect;
use crate::table::{Column, Table, Value};
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Narrow scrub used when the dialect pattern does not compile
static NEWLINE_SCRUB: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\\n|\n"));

/// Per-table coercion pass
#[derive(Debug, Clone)]
pub struct TypeCoercer {
    dialect: StagingDialect,
    scrub: std::result::Result<Regex, regex::Error>,
}

impl TypeCoercer {
    /// Create a coercer for a dialect
    pub fn new(dialect: StagingDialect) -> Self {
        let scrub = Regex::new(dialect.scrub_pattern());
        Self { dialect, scrub }
    }

    /// Dialect in use
    pub fn dialect(&self) -> &StagingDialect {
        &self.dialect
    }

    /// Coerce every column in place and return the committed profiles.
    ///
    /// Row count and column order are unchanged. Running this on an already
    /// coerced table is a no-op.
    pub fn coerce(&self, table: &mut Table) -> Result<Vec<ColumnProfile>> {
        let scrub = self.scrubber()?;
        let mut profiles = Vec::with_capacity(table.num_columns());

        for column in table.columns_mut() {
            let profile = ColumnProfile::infer(column);
            if profile.mixed {
                warn!(
                    column = %profile.name,
                    kinds = ?profile.observed,
                    "Mixed-type column, coercing to text"
                );
            }
            self.apply(column, &profile);
            scrub_column(column, scrub);
            profiles.push(profile);
        }

        debug!(columns = profiles.len(), rows = table.num_rows(), "Coerced table");
        Ok(profiles)
    }

    fn scrubber(&self) -> Result<&Regex> {
        match &self.scrub {
            Ok(regex) => Ok(regex),
            Err(e) => {
                warn!(
                    pattern = self.dialect.scrub_pattern(),
                    error = %e,
                    "Scrub pattern invalid, falling back to newline-only scrub"
                );
                NEWLINE_SCRUB
                    .as_ref()
                    .map_err(|e| Error::coercion(format!("newline scrub unavailable: {e}")))
            }
        }
    }

    fn apply(&self, column: &mut Column, profile: &ColumnProfile) {
        let format = self.dialect.timestamp_format();

        for value in column.values_mut() {
            let replacement = match (profile.kind, &*value) {
                (ColumnKind::Timestamp, Value::Timestamp(ts)) => {
                    Some(Value::Text(ts.format(format).to_string()))
                }
                (ColumnKind::Timestamp, Value::Null) => {
                    Some(Value::Text(self.dialect.timestamp_null().to_string()))
                }
                (kind, Value::Null) if kind.is_numeric() => {
                    Some(Value::Sentinel(self.dialect.null_text().to_string()))
                }
                (ColumnKind::Floating, Value::Integer(i)) => Some(Value::Float(*i as f64)),
                (ColumnKind::Text, Value::Integer(_) | Value::Float(_) | Value::Timestamp(_)) => {
                    value.render(format).map(Value::Text)
                }
                _ => None,
            };

            if let Some(replacement) = replacement {
                *value = replacement;
            }
        }
    }
}

fn scrub_column(column: &mut Column, scrub: &Regex) {
    for value in column.values_mut() {
        if let Value::Text(text) = value {
            // Removing one match can join its neighbours into another
            loop {
                let scrubbed = match scrub.replace_all(text, "") {
                    Cow::Borrowed(_) => break,
                    Cow::Owned(scrubbed) => scrubbed,
                };
                if scrubbed == *text {
                    break;
                }
                *text = scrubbed;
            }
        }
    }
}
