//! CLI module
//!
//! Command-line interface for running pipelines.
//!
//! # Commands
//!
//! - `run` - Run the incremental extraction loop
//! - `stage` - Stage a directory of flat files
//! - `inspect` - Read back a staged file
//! - `state` - Show or set the watermark

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, StateAction};
pub use runner::Runner;
