//! Table module
//!
//! In-memory tabular data and JSON batch normalization.
//!
//! # Overview
//!
//! - `Table` - Ordered, equal-length columns of runtime-typed values
//! - `Value` - A cell: null, integer, float, timestamp, text or sentinel
//! - `BatchNormalizer` - Flattens nested JSON batches into a `Table`

mod normalizer;
mod types;

pub use normalizer::BatchNormalizer;
pub use types::{format_float, parse_timestamp, Column, ScalarKind, Table, Value};
