//! State management module
//!
//! Persists the watermark: the last calendar date fully ingested and loaded.
//! It is read at the start of a run and advanced once the window's artifacts
//! are loaded.
//!
//! # Overview
//!
//! - `WatermarkState` - Serialized watermark
//! - `WatermarkStore` - File-based persistence with atomic writes

mod store;
mod types;

pub use store::WatermarkStore;
pub use types::{parse_date, WatermarkState, DATE_FORMAT};

#[cfg(test)]
mod store_tests;
