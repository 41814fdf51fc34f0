//! Engine types
//!
//! Outcome and statistics of one run of the incremental loop.

use chrono::NaiveDate;
use std::time::Duration;

/// How a run ended. Fatal errors are returned as `Err` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The watermark already covers every day before the end date
    UpToDate,
    /// Every day of the window was loaded and the watermark advanced
    Completed,
    /// A recoverable failure stopped the window; the watermark and the
    /// staged files are left as they were
    Aborted {
        /// What went wrong
        reason: String,
    },
}

impl RunOutcome {
    /// Check if the watermark was advanced
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::UpToDate => write!(f, "up to date"),
            RunOutcome::Completed => write!(f, "completed"),
            RunOutcome::Aborted { reason } => write!(f, "aborted: {reason}"),
        }
    }
}

/// Statistics from a run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Days fetched
    pub days: usize,
    /// Requests issued through the extractor
    pub requests: usize,
    /// Raw batches received
    pub batches: usize,
    /// Rows landed across all datasets
    pub rows_landed: usize,
    /// Files staged across all datasets
    pub files_staged: usize,
    /// Files skipped or failed during staging
    pub files_rejected: usize,
    /// Drift reports across all staging passes
    pub drift_reports: usize,
    /// Artifacts handed to the loader
    pub artifacts_loaded: usize,
    /// Entities taken from the entity snapshot
    pub entities: usize,
    /// Wall-clock duration
    pub duration: Duration,
}

/// Result of one run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// How the run ended
    pub outcome: RunOutcome,
    /// Watermark at the start of the run
    pub start: NaiveDate,
    /// Exclusive end of the window
    pub end: NaiveDate,
    /// Statistics
    pub stats: RunStats,
}

impl RunReport {
    /// Number of days in the window
    pub fn window_days(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }
}
