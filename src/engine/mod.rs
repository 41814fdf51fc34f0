//! Execution engine module
//!
//! The incremental extraction loop: fetch every day between the watermark
//! and the end date, land and stage each dataset, load the artifacts and
//! only then advance the watermark.
//!
//! # Overview
//!
//! - `IncrementalExtractionLoop` - Drives one window per run
//! - `RunReport` - Outcome, window bounds and statistics
//! - `RunOutcome` - `UpToDate`, `Completed` or `Aborted`

mod types;

pub use types::{RunOutcome, RunReport, RunStats};

use crate::config::{DailyDatasetConfig, PipelineConfig, RequestDef, SnapshotConfig};
use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::load::Loader;
use crate::output::StagingDialect;
use crate::stage::{daily_file_name, snapshot_file_name, StagingPass, Workspace};
use crate::state::WatermarkStore;
use crate::table::{BatchNormalizer, Table};
use crate::template::TemplateContext;
use crate::types::{LoadMode, RawBatch};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Lexical form of timestamp entity ids
const ENTITY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Runs the daily extraction window of one pipeline
pub struct IncrementalExtractionLoop {
    extractor: Box<dyn Extractor>,
    loader: Box<dyn Loader>,
    store: WatermarkStore,
    workspace: Workspace,
    pass: StagingPass,
    normalizer: BatchNormalizer,
    snapshots: Vec<SnapshotConfig>,
    datasets: Vec<DailyDatasetConfig>,
    context: TemplateContext,
}

impl IncrementalExtractionLoop {
    /// Build the loop for a pipeline
    pub fn new(
        config: &PipelineConfig,
        extractor: Box<dyn Extractor>,
        loader: Box<dyn Loader>,
        store: WatermarkStore,
    ) -> Result<Self> {
        let workspace = Workspace::new(&config.work_dir).with_datasets(config.dataset_names());
        let pass = StagingPass::new(
            workspace.stage_dir(),
            StagingDialect::new(),
            config.warehouse.warehouse_types()?,
        )
        .with_ddl_mode(config.staging.ddl_mode)
        .with_source_column(config.staging.source_column.clone());

        // Entity source first so per-entity snapshots see its entities
        let mut snapshots = config.snapshots.clone();
        snapshots.sort_by_key(|s| s.entity_key.is_none());

        Ok(Self {
            extractor,
            loader,
            store,
            workspace,
            pass,
            normalizer: BatchNormalizer::new(),
            snapshots,
            datasets: config.datasets.clone(),
            context: config.template_context(),
        })
    }

    /// Replace the template context (`env` and `vars`)
    #[must_use]
    pub fn with_context(mut self, context: TemplateContext) -> Self {
        self.context = context;
        self
    }

    /// Watermark store
    pub fn store(&self) -> &WatermarkStore {
        &self.store
    }

    /// Scratch directories
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Fetch, stage and load every day from the watermark up to `end`
    /// (exclusive), then move the watermark to `end`.
    ///
    /// Recoverable failures end the run as [`RunOutcome::Aborted`] with the
    /// watermark untouched and the scratch files kept for diagnosis.
    pub async fn run_until(&self, end: NaiveDate) -> Result<RunReport> {
        let started = Instant::now();
        let start = self.store.last_date().await?;
        let mut stats = RunStats::default();

        let outcome = if start >= end {
            if start > end {
                warn!(watermark = %start, %end, "Watermark is ahead of the end date, nothing to do");
            } else {
                info!(watermark = %start, "Already caught up");
            }
            RunOutcome::UpToDate
        } else {
            info!(%start, %end, days = (end - start).num_days(), "Starting window");
            match self.process_window(start, end, &mut stats).await {
                Ok(()) => {
                    self.store.advance_to(end).await?;
                    if let Err(e) = self.workspace.purge_all() {
                        warn!(error = %e, "Failed to purge the work directory");
                    }
                    RunOutcome::Completed
                }
                Err(e) if e.is_recoverable() => {
                    error!(%start, %end, error = %e, "Window aborted, watermark unchanged");
                    RunOutcome::Aborted {
                        reason: e.to_string(),
                    }
                }
                Err(e) => return Err(e),
            }
        };

        stats.duration = started.elapsed();
        info!(
            %outcome,
            days = stats.days,
            rows = stats.rows_landed,
            artifacts = stats.artifacts_loaded,
            duration_ms = stats.duration.as_millis() as u64,
            "Run finished"
        );
        Ok(RunReport {
            outcome,
            start,
            end,
            stats,
        })
    }

    async fn process_window(&self, start: NaiveDate, end: NaiveDate, stats: &mut RunStats) -> Result<()> {
        self.workspace.reset()?;

        let entities = self.run_snapshots(stats).await?;

        for day in start.iter_days().take_while(|day| *day < end) {
            let mut ctx = self.context.clone();
            ctx.set_window(day);

            for dataset in &self.datasets {
                let table = self
                    .fetch_table(&dataset.request, dataset.per_entity, &entities, &ctx, stats)
                    .await?;
                if table.is_empty() {
                    debug!(dataset = %dataset.name, %day, "No rows for day");
                    continue;
                }

                let file_name = daily_file_name(&dataset.name, day);
                self.workspace.land(&dataset.name, &file_name, &table)?;
                stats.rows_landed += table.num_rows();
                debug!(dataset = %dataset.name, %day, rows = table.num_rows(), "Landed day");
            }
            stats.days += 1;
        }

        for dataset in &self.datasets {
            self.stage_and_load(&dataset.name, dataset.load_mode, stats)?;
        }
        Ok(())
    }

    /// Fetch, land, stage and load the snapshots; returns the entity ids
    async fn run_snapshots(&self, stats: &mut RunStats) -> Result<Vec<String>> {
        let mut entities: Option<Vec<String>> = None;

        for snapshot in &self.snapshots {
            let known = entities.as_deref().unwrap_or_default();
            let table = self
                .fetch_table(&snapshot.request, snapshot.per_entity, known, &self.context, stats)
                .await?;

            if entities.is_none() {
                if let Some(key) = &snapshot.entity_key {
                    let ids = entity_ids(&table, key)?;
                    info!(snapshot = %snapshot.name, key = %key, entities = ids.len(), "Entities loaded");
                    stats.entities = ids.len();
                    entities = Some(ids);
                }
            }

            if table.is_empty() {
                warn!(snapshot = %snapshot.name, "Snapshot returned no rows");
                continue;
            }
            self.workspace
                .land(&snapshot.name, &snapshot_file_name(&snapshot.name), &table)?;
            stats.rows_landed += table.num_rows();
            self.stage_and_load(&snapshot.name, snapshot.load_mode, stats)?;
        }

        Ok(entities.unwrap_or_default())
    }

    /// Fetch one request, once or per entity, and normalize all batches together
    async fn fetch_table(
        &self,
        request: &RequestDef,
        per_entity: bool,
        entities: &[String],
        ctx: &TemplateContext,
        stats: &mut RunStats,
    ) -> Result<Table> {
        let mut batches = Vec::new();
        if per_entity {
            for entity in entities {
                let mut ctx = ctx.clone();
                ctx.set_entity(entity);
                batches.extend(self.fetch(request, &ctx, stats).await?);
            }
        } else {
            batches = self.fetch(request, ctx, stats).await?;
        }
        self.normalize(&batches, request.record_path.as_deref())
    }

    async fn fetch(&self, request: &RequestDef, ctx: &TemplateContext, stats: &mut RunStats) -> Result<Vec<RawBatch>> {
        let rendered = request.render(ctx)?;
        let batches = self.extractor.fetch(&rendered).await?;
        stats.requests += 1;
        stats.batches += batches.len();
        Ok(batches)
    }

    fn normalize(&self, batches: &[RawBatch], record_path: Option<&str>) -> Result<Table> {
        match record_path {
            Some(path) => self.normalizer.normalize_all(batches, path),
            None => batches
                .iter()
                .map(|batch| self.normalizer.normalize(batch, None))
                .collect::<Result<Vec<_>>>()
                .map(Table::concat),
        }
    }

    /// Stage a dataset's landing directory and hand the artifact to the loader
    fn stage_and_load(&self, dataset: &str, mode: LoadMode, stats: &mut RunStats) -> Result<()> {
        let report = self.pass.run(&self.workspace.landing_dir(dataset))?;
        stats.files_staged += report.staged();
        stats.files_rejected += report.outcomes.len() - report.staged();
        stats.drift_reports += report.drift.len();

        if report.artifact.is_empty() {
            info!(dataset, "Nothing staged, skipping load");
            return Ok(());
        }

        self.loader.load(&report.artifact, mode)?;
        stats.artifacts_loaded += 1;
        self.workspace.purge_stage()?;
        Ok(())
    }
}

impl std::fmt::Debug for IncrementalExtractionLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalExtractionLoop")
            .field("workspace", &self.workspace)
            .field("snapshots", &self.snapshots.len())
            .field("datasets", &self.datasets.len())
            .finish_non_exhaustive()
    }
}

/// Distinct non-null values of `key` in order of appearance
fn entity_ids(table: &Table, key: &str) -> Result<Vec<String>> {
    if table.is_empty() {
        return Ok(Vec::new());
    }
    let column = table
        .column(key)
        .ok_or_else(|| Error::structure(key, "entity key column missing from snapshot"))?;

    let mut seen = HashSet::new();
    Ok(column
        .values()
        .iter()
        .filter_map(|value| value.render(ENTITY_TIMESTAMP_FORMAT))
        .filter(|id| seen.insert(id.clone()))
        .collect())
}
