//! Column profiles
//!
//! A profile is the kind a column is committed to before any value is
//! rewritten. It is inferred from the runtime kinds present in the column.

use crate::table::{Column, ScalarKind, Value};
use std::collections::BTreeSet;

/// Inferred kind of a whole column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Integer,
    Floating,
    Timestamp,
    Text,
}

impl ColumnKind {
    /// Check for integer or floating
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Floating)
    }

    /// Smallest kind holding both, used when profiles of the same column
    /// from different tables are merged
    #[must_use]
    pub fn widen(self, other: ColumnKind) -> ColumnKind {
        match (self, other) {
            (a, b) if a == b => a,
            (ColumnKind::Integer, ColumnKind::Floating)
            | (ColumnKind::Floating, ColumnKind::Integer) => ColumnKind::Floating,
            _ => ColumnKind::Text,
        }
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Integer => write!(f, "integer"),
            ColumnKind::Floating => write!(f, "floating"),
            ColumnKind::Timestamp => write!(f, "timestamp"),
            ColumnKind::Text => write!(f, "text"),
        }
    }
}

/// Inferred profile of one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnProfile {
    /// Column name
    pub name: String,
    /// Kind the column is coerced to
    pub kind: ColumnKind,
    /// The column held incompatible kinds and was forced to text
    pub mixed: bool,
    /// Runtime kinds observed, nulls and sentinels excluded
    pub observed: BTreeSet<ScalarKind>,
}

impl ColumnProfile {
    /// Infer a profile from a column's values
    pub fn infer(column: &Column) -> Self {
        Self::from_values(&column.name, column.values())
    }

    /// Infer a profile from a name and values
    pub fn from_values(name: &str, values: &[Value]) -> Self {
        let observed: BTreeSet<ScalarKind> = values.iter().filter_map(Value::kind).collect();
        let (kind, mixed) = classify(&observed);
        Self {
            name: name.to_string(),
            kind,
            mixed,
            observed,
        }
    }
}

fn classify(observed: &BTreeSet<ScalarKind>) -> (ColumnKind, bool) {
    use ScalarKind::{Float, Integer, Text, Timestamp};

    let only = |kinds: &[ScalarKind]| observed.iter().all(|k| kinds.contains(k));

    if observed.is_empty() {
        (ColumnKind::Text, false)
    } else if only(&[Timestamp]) {
        (ColumnKind::Timestamp, false)
    } else if only(&[Integer]) {
        (ColumnKind::Integer, false)
    } else if only(&[Integer, Float]) {
        (ColumnKind::Floating, false)
    } else if only(&[Text]) {
        (ColumnKind::Text, false)
    } else {
        (ColumnKind::Text, true)
    }
}
