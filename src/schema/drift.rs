//! Schema drift tracking
//!
//! The reference column set is owned by the staging pass and threaded through
//! each observation: `observe` consumes the current state and returns the
//! next one along with an optional report.

use std::collections::BTreeSet;
use tracing::warn;

/// Column-name difference between one table and the reference set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftReport {
    /// Where the table came from, usually a file name
    pub source: String,
    /// Columns present in the table but not in the reference
    pub extra: BTreeSet<String>,
    /// Reference columns absent from the table
    pub missing: BTreeSet<String>,
}

/// Running reference column set of one staging pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReferenceColumnSet {
    /// No table observed yet
    #[default]
    Uninitialized,
    /// Reference established; it only ever grows
    Tracking(BTreeSet<String>),
}

impl ReferenceColumnSet {
    /// Create an uninitialized tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a table's columns.
    ///
    /// The first observation becomes the reference. Later ones are diffed
    /// against it; extra columns are folded into the reference. Never fails.
    #[must_use]
    pub fn observe<'a, I>(self, columns: I, source: &str) -> (Self, Option<DriftReport>)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let current: BTreeSet<String> = columns.into_iter().map(str::to_string).collect();

        let mut reference = match self {
            ReferenceColumnSet::Uninitialized => {
                return (ReferenceColumnSet::Tracking(current), None);
            }
            ReferenceColumnSet::Tracking(reference) => reference,
        };

        let extra: BTreeSet<String> = current.difference(&reference).cloned().collect();
        let missing: BTreeSet<String> = reference.difference(&current).cloned().collect();

        if extra.is_empty() && missing.is_empty() {
            return (ReferenceColumnSet::Tracking(reference), None);
        }

        if !extra.is_empty() {
            warn!(source, columns = ?extra, "Extra columns compared to reference");
        }
        if !missing.is_empty() {
            warn!(source, columns = ?missing, "Missing columns compared to reference");
        }

        reference.extend(extra.iter().cloned());
        let report = DriftReport {
            source: source.to_string(),
            extra,
            missing,
        };
        (ReferenceColumnSet::Tracking(reference), Some(report))
    }

    /// Current reference columns, if established
    pub fn columns(&self) -> Option<&BTreeSet<String>> {
        match self {
            ReferenceColumnSet::Uninitialized => None,
            ReferenceColumnSet::Tracking(columns) => Some(columns),
        }
    }
}
