//! Staging module
//!
//! Runs a staging pass over a directory of flat files and manages the
//! scratch directories of a run.
//!
//! # Overview
//!
//! - `StagingPass` - Drift check, coercion and staging for every file
//! - `StagingReport` - Artifact, per-file outcomes and drift reports
//! - `Workspace` - Landing and stage directories, purge and cleanup

mod pass;
mod types;
mod workspace;

pub use pass::{StagingPass, SOURCE_COLUMN};
pub use types::{FileOutcome, StagingArtifact, StagingReport};
pub use workspace::{daily_file_name, purge_dir, snapshot_file_name, Workspace, STAGE_DIR};
