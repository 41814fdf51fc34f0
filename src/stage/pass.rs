//! Staging pass over a directory of flat files
//!
//! Each file is read, checked for column drift, coerced, tagged with its
//! source file name and staged. A file that fails is recorded and the pass
//! moves on.

use super::types::{FileOutcome, StagingArtifact, StagingReport};
use super::workspace::ensure_dir;
use crate::coerce::{ColumnProfile, TypeCoercer};
use crate::error::{Error, Result};
use crate::output::{CsvStager, StagingDialect};
use crate::schema::{DdlColumns, DdlMode, DdlProjector, ReferenceColumnSet, WarehouseTypes};
use crate::table::{parse_timestamp, BatchNormalizer, Column, Table, Value};
use crate::types::JsonValue;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Default name of the column holding the source file name
pub const SOURCE_COLUMN: &str = "File Name";

/// Stages every flat file of a directory
#[derive(Debug, Clone)]
pub struct StagingPass {
    stage_dir: PathBuf,
    normalizer: BatchNormalizer,
    coercer: TypeCoercer,
    stager: CsvStager,
    projector: DdlProjector,
    ddl_mode: DdlMode,
    source_column: Option<String>,
}

impl StagingPass {
    /// Create a pass writing into `stage_dir`
    pub fn new(stage_dir: impl Into<PathBuf>, dialect: StagingDialect, types: WarehouseTypes) -> Self {
        Self {
            stage_dir: stage_dir.into(),
            normalizer: BatchNormalizer::new(),
            coercer: TypeCoercer::new(dialect.clone()),
            stager: CsvStager::new(dialect),
            projector: DdlProjector::new(types),
            ddl_mode: DdlMode::default(),
            source_column: Some(SOURCE_COLUMN.to_string()),
        }
    }

    /// Set how the DDL fragment is derived
    #[must_use]
    pub fn with_ddl_mode(mut self, mode: DdlMode) -> Self {
        self.ddl_mode = mode;
        self
    }

    /// Set the source-file column name; `None` disables it
    #[must_use]
    pub fn with_source_column(mut self, column: Option<String>) -> Self {
        self.source_column = column;
        self
    }

    /// Stage directory
    pub fn stage_dir(&self) -> &Path {
        &self.stage_dir
    }

    /// Stage every `.jsonl` and `.csv` file of `input_dir` in name order.
    ///
    /// Only failing to list the directory or create the stage directory is
    /// an error; per-file problems end up in the report.
    pub fn run(&self, input_dir: &Path) -> Result<StagingReport> {
        let dataset = input_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        ensure_dir(&self.stage_dir)?;
        let inputs = list_inputs(input_dir)?;
        info!(dataset = %dataset, files = inputs.len(), "Starting staging pass");

        let mut reference = ReferenceColumnSet::new();
        let mut ddl_columns = DdlColumns::new(self.ddl_mode);
        let mut report = StagingReport {
            artifact: StagingArtifact {
                dataset,
                dir: self.stage_dir.clone(),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut written = HashSet::new();

        for path in inputs {
            let source = file_name(&path);

            let mut table = match self.read_input(&path) {
                Ok(table) if table.is_empty() => {
                    debug!(file = %source, "No rows, skipping");
                    report.outcomes.push(FileOutcome::Skipped {
                        source,
                        reason: "no rows".to_string(),
                    });
                    continue;
                }
                Ok(table) => table,
                Err(e) => {
                    error!(file = %source, error = %e, "Failed to read input file, skipping");
                    report.outcomes.push(FileOutcome::Skipped {
                        source,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let target = self.staged_path(&path, &source);
            if !written.insert(target.clone()) {
                error!(file = %source, target = %target.display(), "Staged name already taken, skipping");
                report.outcomes.push(FileOutcome::Failed {
                    reason: format!("{} was already staged from another file", file_name(&target)),
                    source,
                });
                continue;
            }

            let (next, drift) = reference.observe(table.column_names(), &source);
            reference = next;
            report.drift.extend(drift);

            match self.stage_table(&mut table, &target, &source) {
                Ok((staged, profiles)) => {
                    ddl_columns.absorb(&profiles);
                    report.artifact.rows += table.num_rows();
                    report.artifact.files.push(staged.clone());
                    report.outcomes.push(FileOutcome::Staged {
                        source,
                        path: staged,
                        rows: table.num_rows(),
                    });
                }
                Err(e) => {
                    error!(file = %source, error = %e, "Failed to stage file, skipping");
                    report.outcomes.push(FileOutcome::Failed {
                        source,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.artifact.ddl = self.projector.render(ddl_columns.columns());
        info!(
            dataset = %report.artifact.dataset,
            staged = report.staged(),
            failed = report.failed(),
            rows = report.artifact.rows,
            drift = report.drift.len(),
            "Staging pass complete"
        );
        Ok(report)
    }

    /// `<stem>.csv` in the stage directory
    fn staged_path(&self, path: &Path, source: &str) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.to_string());
        self.stage_dir.join(format!("{stem}.csv"))
    }

    fn stage_table(
        &self,
        table: &mut Table,
        target: &Path,
        source: &str,
    ) -> Result<(PathBuf, Vec<ColumnProfile>)> {
        let mut profiles = self.coercer.coerce(table)?;

        if let Some(column) = &self.source_column {
            if table.column(column).is_some() {
                warn!(file = %source, column = %column, "Source column already present, not overwritten");
            } else {
                table.push_constant(column.clone(), Value::Text(source.to_string()))?;
                if let Some(added) = table.columns().last() {
                    profiles.push(ColumnProfile::infer(added));
                }
            }
        }

        if !self.stager.stage(table, target) {
            return Err(Error::staging(format!("could not write {}", target.display())));
        }
        Ok((target.to_path_buf(), profiles))
    }

    fn read_input(&self, path: &Path) -> Result<Table> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("jsonl") => self.read_jsonl(path),
            Some("csv") => read_csv(path),
            _ => Err(Error::staging(format!("unsupported file {}", path.display()))),
        }
    }

    fn read_jsonl(&self, path: &Path) -> Result<Table> {
        let content = std::fs::read_to_string(path)?;
        let records = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<JsonValue>)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(self.normalizer.normalize_records(&records))
    }
}

/// Read a comma-delimited file with a header row
fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut columns: Vec<Column> = reader
        .headers()?
        .iter()
        .map(|name| Column::new(name, Vec::new()))
        .collect();

    for record in reader.records() {
        let record = record?;
        for (column, cell) in columns.iter_mut().zip(record.iter()) {
            column.values.push(parse_cell(cell));
        }
    }

    Table::from_columns(columns)
}

/// Sniff a CSV cell: empty is null, then integer, float, timestamp, text
fn parse_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = cell.parse::<f64>() {
        if f.is_finite() {
            return Value::Float(f);
        }
    }
    if let Some(ts) = parse_timestamp(cell) {
        return Value::Timestamp(ts);
    }
    Value::Text(cell.to_string())
}

fn list_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::FileNotFound {
            path: dir.display().to_string(),
        });
    }

    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let supported = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("jsonl" | "csv")
        );
        if path.is_file() && supported {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
