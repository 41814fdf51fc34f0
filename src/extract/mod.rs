//! Extraction module
//!
//! Fetches raw JSON batches for the incremental loop.
//!
//! # Overview
//!
//! - `Extractor` - Async source of raw batches; the loop depends only on this
//! - `ApiExtractor` - HTTP implementation with page-number pagination
//! - `FetchRequest` - One rendered request: path, params, body, record path

mod api;
mod types;

pub use api::ApiExtractor;
pub use types::{Extractor, FetchRequest, PageLocation, Pagination};
