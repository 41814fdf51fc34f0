//! Workspace directories
//!
//! Layout under the work dir:
//! - `<work_dir>/<dataset>/` landing files per dataset
//! - `<work_dir>/stage/` staged artifacts of the dataset being loaded

use crate::error::{Result, ResultExt};
use crate::table::Table;
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the stage directory under the work dir
pub const STAGE_DIR: &str = "stage";

/// Landing file name for one day of a daily dataset
pub fn daily_file_name(dataset: &str, day: NaiveDate) -> String {
    format!("{dataset}_{}.jsonl", day.format("%Y%m%d000000"))
}

/// Landing file name for a snapshot dataset
pub fn snapshot_file_name(dataset: &str) -> String {
    format!("{dataset}.jsonl")
}

/// Scratch directories owned by one run.
///
/// Only the stage directory and the landing directories of the configured
/// datasets are ever emptied; anything else under the root is left alone.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    datasets: Vec<String>,
}

impl Workspace {
    /// Create a workspace rooted at `root`; nothing is created yet
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            datasets: Vec::new(),
        }
    }

    /// Datasets whose landing directories this workspace owns
    #[must_use]
    pub fn with_datasets<I, S>(mut self, datasets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.datasets = datasets.into_iter().map(Into::into).collect();
        self
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Landing directory of a dataset
    pub fn landing_dir(&self, dataset: &str) -> PathBuf {
        self.root.join(dataset)
    }

    /// Stage directory
    pub fn stage_dir(&self) -> PathBuf {
        self.root.join(STAGE_DIR)
    }

    /// Stage directory followed by every landing directory
    fn owned_dirs(&self) -> impl Iterator<Item = PathBuf> + '_ {
        std::iter::once(self.stage_dir()).chain(self.datasets.iter().map(|d| self.landing_dir(d)))
    }

    /// Empty what a previous run left in the owned directories, then
    /// create them
    pub fn reset(&self) -> Result<()> {
        for dir in self.owned_dirs() {
            let removed = purge_dir(&dir)?;
            if removed > 0 {
                debug!(dir = %dir.display(), removed, "Removed leftovers of a previous run");
            }
            ensure_dir(&dir)?;
        }
        Ok(())
    }

    /// Write a table as JSON lines into a dataset's landing directory
    pub fn land(&self, dataset: &str, file_name: &str, table: &Table) -> Result<PathBuf> {
        let dir = self.landing_dir(dataset);
        ensure_dir(&dir)?;
        let path = dir.join(file_name);

        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        write_json_lines(BufWriter::new(file), table)
            .with_context(|| format!("writing {}", path.display()))?;

        debug!(dataset, path = %path.display(), rows = table.num_rows(), "Landed table");
        Ok(path)
    }

    /// Empty the stage directory
    pub fn purge_stage(&self) -> Result<usize> {
        purge_dir(&self.stage_dir())
    }

    /// Remove the stage directory and every landing directory.
    /// Returns the number of directories removed.
    pub fn purge_all(&self) -> Result<usize> {
        let mut removed = 0;
        for dir in self.owned_dirs() {
            if dir.exists() {
                fs::remove_dir_all(&dir).with_context(|| format!("removing {}", dir.display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// One JSON object per line. Records are serialized before they are
/// written, so a failed write surfaces as an I/O error.
fn write_json_lines<W: Write>(mut out: W, table: &Table) -> Result<()> {
    for record in table.to_records() {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        out.write_all(&line)?;
    }
    out.flush()?;
    Ok(())
}

/// Create a directory and its parents if missing
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))
}

/// Delete every file and subdirectory inside `dir`, keeping `dir` itself.
/// Returns the number of entries removed; a missing directory counts as empty.
pub fn purge_dir(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        removed += 1;
    }
    Ok(removed)
}
