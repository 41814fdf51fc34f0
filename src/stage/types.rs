//! Staging pass types

use crate::schema::DriftReport;
use std::path::PathBuf;

/// Directory of staged files plus the column DDL for loading them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingArtifact {
    /// Logical dataset name, also the target table
    pub dataset: String,
    /// Directory holding the staged files
    pub dir: PathBuf,
    /// Staged files in the order they were written
    pub files: Vec<PathBuf>,
    /// Total data rows across files
    pub rows: usize,
    /// `"name" TYPE, ...` fragment
    pub ddl: String,
}

impl StagingArtifact {
    /// Check if there is nothing to load
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// What happened to one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Written to the stage directory
    Staged {
        source: String,
        path: PathBuf,
        rows: usize,
    },
    /// Not staged because it could not be read or held no rows
    Skipped { source: String, reason: String },
    /// Read, but coercion or writing failed
    Failed { source: String, reason: String },
}

impl FileOutcome {
    /// Source file name
    pub fn source(&self) -> &str {
        match self {
            FileOutcome::Staged { source, .. }
            | FileOutcome::Skipped { source, .. }
            | FileOutcome::Failed { source, .. } => source,
        }
    }

    /// Check if the file was staged
    pub fn is_staged(&self) -> bool {
        matches!(self, FileOutcome::Staged { .. })
    }
}

impl std::fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOutcome::Staged { source, rows, .. } => write!(f, "staged  {source} ({rows} rows)"),
            FileOutcome::Skipped { source, reason } => write!(f, "skipped {source}: {reason}"),
            FileOutcome::Failed { source, reason } => write!(f, "failed  {source}: {reason}"),
        }
    }
}

/// Result of one staging pass
#[derive(Debug, Clone, Default)]
pub struct StagingReport {
    /// The staged artifact
    pub artifact: StagingArtifact,
    /// Per-file outcomes in processing order
    pub outcomes: Vec<FileOutcome>,
    /// Column drift observed against the pass reference
    pub drift: Vec<DriftReport>,
}

impl StagingReport {
    /// Number of files staged
    pub fn staged(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_staged()).count()
    }

    /// Number of files that were read but failed to stage
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Failed { .. }))
            .count()
    }
}
