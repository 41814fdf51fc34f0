//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat, StateAction};
use crate::config::PipelineConfig;
use crate::engine::{IncrementalExtractionLoop, RunOutcome, RunReport};
use crate::error::{Error, Result};
use crate::extract::ApiExtractor;
use crate::http::HttpClient;
use crate::load::{DuckDbLoader, Loader};
use crate::output::{ArtifactReader, StagingDialect};
use crate::schema::{DdlMode, WarehouseTypes};
use crate::stage::StagingPass;
use crate::state::{parse_date, WatermarkStore};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::path::Path;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run { config, until } => self.run_pipeline(config, until.as_deref()).await,
            Commands::Stage {
                input,
                output,
                ddl_mode,
                types,
                source_column,
                no_source_column,
            } => {
                let source_column = (!no_source_column).then(|| source_column.clone());
                self.stage(input, output, ddl_mode, types, source_column)
            }
            Commands::Inspect { file } => self.inspect(file),
            Commands::State { action } => match action {
                StateAction::Show { config } => self.show_state(config).await,
                StateAction::Set { date, config } => self.set_state(config, date).await,
            },
        }
    }

    /// Run one window of the pipeline
    async fn run_pipeline(&self, config_path: &Path, until: Option<&str>) -> Result<()> {
        let config = PipelineConfig::from_file(config_path)?;
        let end = match until {
            Some(raw) => parse_cli_date("until", raw)?,
            None => chrono::Local::now().date_naive(),
        };

        let warehouse = config.warehouse.require_path()?;

        let ctx = config.template_context();
        let client = HttpClient::with_auth(config.client_config(), config.auth.resolve(&ctx)?)?;
        let loader: Box<dyn Loader> = Box::new(DuckDbLoader::open(warehouse)?);

        let engine = IncrementalExtractionLoop::new(
            &config,
            Box::new(ApiExtractor::new(client)),
            loader,
            open_store(&config)?,
        )?
        .with_context(ctx);

        let report = engine.run_until(end).await?;
        self.output_message(&run_message(&config.name, &report));

        match report.outcome {
            RunOutcome::Aborted { reason } => Err(Error::Other(format!("Run aborted: {reason}"))),
            RunOutcome::UpToDate | RunOutcome::Completed => Ok(()),
        }
    }

    /// Stage a directory and print the outcome of every file
    fn stage(
        &self,
        input: &Path,
        output: &Path,
        ddl_mode: &str,
        types: &str,
        source_column: Option<String>,
    ) -> Result<()> {
        let ddl_mode: DdlMode = ddl_mode.parse()?;
        let types: WarehouseTypes = types.parse()?;

        let report = StagingPass::new(output, StagingDialect::new(), types)
            .with_ddl_mode(ddl_mode)
            .with_source_column(source_column)
            .run(input)?;

        for outcome in &report.outcomes {
            self.log("INFO", &outcome.to_string());
        }
        for drift in &report.drift {
            self.log(
                "WARN",
                &format!(
                    "Column drift in {}: extra {:?}, missing {:?}",
                    drift.source, drift.extra, drift.missing
                ),
            );
        }

        self.output_message(&json!({
            "type": "ARTIFACT",
            "artifact": {
                "dataset": report.artifact.dataset,
                "dir": report.artifact.dir.display().to_string(),
                "files": report
                    .artifact
                    .files
                    .iter()
                    .map(|f| f.display().to_string())
                    .collect::<Vec<_>>(),
                "rows": report.artifact.rows,
                "ddl": report.artifact.ddl,
                "staged": report.staged(),
                "failed": report.failed(),
            }
        }));
        Ok(())
    }

    /// Print a staged file as records
    fn inspect(&self, file: &Path) -> Result<()> {
        let table = ArtifactReader::default().read(file)?;
        for record in table.to_records() {
            self.output_message(&json!({ "type": "RECORD", "record": record }));
        }
        Ok(())
    }

    async fn show_state(&self, config_path: &Path) -> Result<()> {
        let config = PipelineConfig::from_file(config_path)?;
        let store = open_store(&config)?;
        let state = store.state().await;

        self.output_message(&json!({
            "type": "STATE",
            "state": {
                "watermark": store.get_last_state().await.ok(),
                "last_run_date": state.last_run_date.map(|d| d.to_string()),
                "updated_at": state.updated_at.map(|t| t.to_rfc3339()),
                "path": store.path().display().to_string(),
            }
        }));
        Ok(())
    }

    async fn set_state(&self, config_path: &Path, date: &str) -> Result<()> {
        let config = PipelineConfig::from_file(config_path)?;
        let date = parse_cli_date("date", date)?;
        let store = open_store(&config)?;
        store.reset_to(date).await?;

        self.log("INFO", &format!("Watermark set to {date}"));
        Ok(())
    }

    fn log(&self, level: &str, message: &str) {
        self.output_message(&json!({
            "type": "LOG",
            "log": { "level": level, "message": message }
        }));
    }

    /// Output a message in the configured format
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

fn open_store(config: &PipelineConfig) -> Result<WatermarkStore> {
    Ok(WatermarkStore::from_file(&config.state_path)?.with_initial(config.initial_watermark()?))
}

fn parse_cli_date(field: &str, raw: &str) -> Result<NaiveDate> {
    parse_date(raw).ok_or_else(|| Error::invalid_value(field, format!("'{raw}' is not YYYY-MM-DD")))
}

fn run_message(pipeline: &str, report: &RunReport) -> Value {
    let stats = &report.stats;
    json!({
        "type": "RUN",
        "run": {
            "pipeline": pipeline,
            "outcome": report.outcome.to_string(),
            "start": report.start.to_string(),
            "end": report.end.to_string(),
            "days": stats.days,
            "requests": stats.requests,
            "batches": stats.batches,
            "entities": stats.entities,
            "rows_landed": stats.rows_landed,
            "files_staged": stats.files_staged,
            "files_rejected": stats.files_rejected,
            "drift_reports": stats.drift_reports,
            "artifacts_loaded": stats.artifacts_loaded,
            "duration_ms": stats.duration.as_millis() as u64,
        }
    })
}
