//! Column DDL projection
//!
//! Maps column kinds to warehouse type names and renders the
//! `"name" TYPE, ...` fragment handed to the loader.

use crate::coerce::{ColumnKind, ColumnProfile};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Warehouse type names for each column kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseTypes {
    integer: String,
    floating: String,
    timestamp: String,
    text: String,
}

impl Default for WarehouseTypes {
    fn default() -> Self {
        Self::snowflake()
    }
}

impl WarehouseTypes {
    /// Custom type names
    pub fn new(
        integer: impl Into<String>,
        floating: impl Into<String>,
        timestamp: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            integer: integer.into(),
            floating: floating.into(),
            timestamp: timestamp.into(),
            text: text.into(),
        }
    }

    /// Snowflake type names
    pub fn snowflake() -> Self {
        Self::new("NUMBER", "FLOAT", "TIMESTAMP", "TEXT")
    }

    /// DuckDB type names
    pub fn duckdb() -> Self {
        Self::new("BIGINT", "DOUBLE", "TIMESTAMP", "VARCHAR")
    }

    /// Type name for a kind
    pub fn type_for(&self, kind: ColumnKind) -> &str {
        match kind {
            ColumnKind::Integer => &self.integer,
            ColumnKind::Floating => &self.floating,
            ColumnKind::Timestamp => &self.timestamp,
            ColumnKind::Text => &self.text,
        }
    }
}

impl FromStr for WarehouseTypes {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "snowflake" => Ok(Self::snowflake()),
            "duckdb" => Ok(Self::duckdb()),
            other => Err(Error::invalid_value(
                "types",
                format!("unknown warehouse '{other}', expected snowflake or duckdb"),
            )),
        }
    }
}

/// Which tables of a pass the DDL fragment is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DdlMode {
    /// The last table staged; assumes a uniform schema across the pass
    #[default]
    LastTable,
    /// All staged tables, columns in first-seen order
    Union,
}

impl FromStr for DdlMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "last" | "last_table" => Ok(DdlMode::LastTable),
            "union" => Ok(DdlMode::Union),
            other => Err(Error::invalid_value(
                "ddl_mode",
                format!("unknown mode '{other}', expected last or union"),
            )),
        }
    }
}

/// Column kinds gathered over a pass according to a `DdlMode`
#[derive(Debug, Clone, Default)]
pub struct DdlColumns {
    mode: DdlMode,
    columns: Vec<(String, ColumnKind)>,
}

impl DdlColumns {
    /// Create an empty set for a mode
    pub fn new(mode: DdlMode) -> Self {
        Self {
            mode,
            columns: Vec::new(),
        }
    }

    /// Take in the profiles of one staged table
    pub fn absorb(&mut self, profiles: &[ColumnProfile]) {
        match self.mode {
            DdlMode::LastTable => {
                self.columns = profiles.iter().map(|p| (p.name.clone(), p.kind)).collect();
            }
            DdlMode::Union => {
                for profile in profiles {
                    match self.columns.iter_mut().find(|(name, _)| *name == profile.name) {
                        Some((_, kind)) => *kind = kind.widen(profile.kind),
                        None => self.columns.push((profile.name.clone(), profile.kind)),
                    }
                }
            }
        }
    }

    /// Columns gathered so far
    pub fn columns(&self) -> &[(String, ColumnKind)] {
        &self.columns
    }

    /// Check if nothing has been absorbed
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Renders column definition fragments
#[derive(Debug, Clone, Default)]
pub struct DdlProjector {
    types: WarehouseTypes,
}

impl DdlProjector {
    /// Create a projector for a set of warehouse types
    pub fn new(types: WarehouseTypes) -> Self {
        Self { types }
    }

    /// Warehouse types in use
    pub fn types(&self) -> &WarehouseTypes {
        &self.types
    }

    /// Render `"name" TYPE` pairs joined by `", "`
    pub fn render(&self, columns: &[(String, ColumnKind)]) -> String {
        columns
            .iter()
            .map(|(name, kind)| {
                format!(
                    "\"{}\" {}",
                    name.replace('"', "\"\""),
                    self.types.type_for(*kind)
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Render straight from one table's profiles
    pub fn render_profiles(&self, profiles: &[ColumnProfile]) -> String {
        let mut columns = DdlColumns::new(DdlMode::LastTable);
        columns.absorb(profiles);
        self.render(columns.columns())
    }
}
