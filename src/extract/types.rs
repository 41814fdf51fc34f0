//! Extraction types

use crate::error::Result;
use crate::types::{JsonValue, Method, RawBatch};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where the page number is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageLocation {
    /// As a query parameter
    #[default]
    Query,
    /// As a top-level field of the JSON body
    Body,
}

/// Pagination of one request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Pagination {
    /// Single request
    #[default]
    None,
    /// Increment a page number until a page holds no records
    PageNumber {
        /// Page parameter name
        #[serde(default = "default_page_param")]
        param: String,
        /// First page number
        #[serde(default = "default_start_page")]
        start: u32,
        /// Upper bound on pages fetched
        #[serde(default)]
        max_pages: Option<u32>,
        /// Where the page number goes
        #[serde(default)]
        location: PageLocation,
    },
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_start_page() -> u32 {
    1
}

/// One rendered extraction request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchRequest {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL
    pub path: String,
    /// Query parameters, already rendered
    pub query: BTreeMap<String, String>,
    /// JSON body, already rendered
    pub body: Option<JsonValue>,
    /// Key holding the record list; pagination stops when it is empty
    pub record_path: Option<String>,
    /// Pagination strategy
    pub pagination: Pagination,
}

impl FetchRequest {
    /// Create a GET request for `path`
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the method
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Set the JSON body
    #[must_use]
    pub fn body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the record path
    #[must_use]
    pub fn record_path(mut self, path: impl Into<String>) -> Self {
        self.record_path = Some(path.into());
        self
    }

    /// Set pagination
    #[must_use]
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }
}

/// Source of raw batches
///
/// Returns every page of one request. A page lacking the record path is a
/// valid "no data" answer, not an error.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Fetch all pages of a request
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<RawBatch>>;
}
