//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Solidafy Stage CLI
#[derive(Parser, Debug)]
#[command(name = "solidafy-stage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the incremental extraction loop
    Run {
        /// Pipeline definition (YAML)
        #[arg(short, long)]
        config: PathBuf,

        /// Exclusive end of the window (YYYY-MM-DD, default: today)
        #[arg(long)]
        until: Option<String>,
    },

    /// Stage a directory of flat files
    Stage {
        /// Directory of `.jsonl` / `.csv` files; its name is the dataset name
        input: PathBuf,

        /// Stage directory
        #[arg(short, long)]
        output: PathBuf,

        /// DDL derivation: last or union
        #[arg(long, default_value = "last")]
        ddl_mode: String,

        /// Warehouse type names: snowflake or duckdb
        #[arg(long, default_value = "snowflake")]
        types: String,

        /// Name of the source-file column
        #[arg(long, default_value = crate::stage::SOURCE_COLUMN)]
        source_column: String,

        /// Do not add the source-file column
        #[arg(long, conflicts_with = "source_column")]
        no_source_column: bool,
    },

    /// Read back a staged file
    Inspect {
        /// Staged file
        file: PathBuf,
    },

    /// Show or set the watermark
    State {
        #[command(subcommand)]
        action: StateAction,
    },
}

/// Watermark actions
#[derive(Subcommand, Debug)]
pub enum StateAction {
    /// Print the current watermark
    Show {
        /// Pipeline definition (YAML)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Overwrite the watermark (YYYY-MM-DD)
    Set {
        /// New watermark
        date: String,

        /// Pipeline definition (YAML)
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from(["solidafy-stage", "run", "-c", "p.yaml", "--until", "2024-01-03"]);
        match cli.command {
            Commands::Run { config, until } => {
                assert_eq!(config, PathBuf::from("p.yaml"));
                assert_eq!(until.as_deref(), Some("2024-01-03"));
            }
            other => panic!("Expected Run, got {other:?}"),
        }
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_stage_defaults() {
        let cli = Cli::parse_from(["solidafy-stage", "stage", "in/counts", "-o", "out", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Stage {
                ddl_mode,
                types,
                source_column,
                no_source_column,
                ..
            } => {
                assert_eq!(ddl_mode, "last");
                assert_eq!(types, "snowflake");
                assert_eq!(source_column, "File Name");
                assert!(!no_source_column);
            }
            other => panic!("Expected Stage, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_state_set() {
        let cli = Cli::parse_from(["solidafy-stage", "state", "set", "2024-01-01", "-c", "p.yaml"]);
        match cli.command {
            Commands::State {
                action: StateAction::Set { date, config },
            } => {
                assert_eq!(date, "2024-01-01");
                assert_eq!(config, PathBuf::from("p.yaml"));
            }
            other => panic!("Expected State Set, got {other:?}"),
        }
    }
}
