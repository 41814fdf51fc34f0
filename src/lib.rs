// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Solidafy Stage
//!
//! Incremental REST-to-warehouse extraction with a flat-file staging layer.
//!
//! ## Features
//!
//! - **Watermarked Runs**: Fetch every day since the last loaded date, load, then advance
//! - **Session Auth**: Login once, send the token on every request
//! - **Type Coercion**: Profile untyped columns into integer, float, timestamp or text
//! - **Staging Dialect**: `~`-separated, quoted, `NULL`-marked files with a DDL fragment
//! - **Column Drift**: Report column-set differences between files of one dataset
//! - **DuckDB Loading**: Truncate or insert staged files in one transaction
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solidafy_stage::{
//!     config::PipelineConfig, engine::IncrementalExtractionLoop, extract::ApiExtractor,
//!     http::HttpClient, load::DuckDbLoader, state::WatermarkStore, Result,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = PipelineConfig::from_file("pipeline.yaml")?;
//!     let ctx = config.template_context();
//!     let client = HttpClient::with_auth(config.client_config(), config.auth.resolve(&ctx)?)?;
//!
//!     let engine = IncrementalExtractionLoop::new(
//!         &config,
//!         Box::new(ApiExtractor::new(client)),
//!         Box::new(DuckDbLoader::open("warehouse.duckdb")?),
//!         WatermarkStore::from_file(&config.state_path)?,
//!     )?;
//!
//!     let report = engine.run_until(chrono::Local::now().date_naive()).await?;
//!     println!("{}", report.outcome);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                  IncrementalExtractionLoop                       │
//! │   watermark → days → fetch → land → stage → load → advance       │
//! └──────────────────────────────────────────────────────────────────┘
//!                                 │
//! ┌──────────┬───────────┬────────┴──────┬─────────────┬────────────┐
//! │ Extract  │  Table    │   Coerce      │   Stage     │   Load     │
//! ├──────────┼───────────┼───────────────┼─────────────┼────────────┤
//! │ Session  │ Normalize │ Integer       │ CSV dialect │ DuckDB     │
//! │ Retry    │ Flatten   │ Float         │ DDL         │ Truncate   │
//! │ Rate lim │ Concat    │ Timestamp     │ Drift       │ Insert     │
//! │ Pages    │           │ Sentinel      │ Source col  │            │
//! └──────────┴───────────┴───────────────┴─────────────┴────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Authentication implementations
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Paged API extraction
pub mod extract;

/// In-memory tables built from raw batches
pub mod table;

/// Column profiling and type coercion
pub mod coerce;

/// Staging-dialect writer and reader
pub mod output;

/// DDL derivation and column drift
pub mod schema;

/// Landing and staging directories
pub mod stage;

/// Watermark persistence
pub mod state;

/// Template interpolation
pub mod template;

/// Warehouse loading
pub mod load;

/// Incremental extraction loop
pub mod engine;

/// Pipeline definitions
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use engine::{IncrementalExtractionLoop, RunOutcome, RunReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
