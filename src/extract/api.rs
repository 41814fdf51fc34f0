//! HTTP API extractor

use super::types::{Extractor, FetchRequest, PageLocation, Pagination};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::types::{JsonValue, RawBatch};
use async_trait::async_trait;
use tracing::{debug, info};

/// Extractor over an [`HttpClient`]
#[derive(Debug)]
pub struct ApiExtractor {
    client: HttpClient,
}

impl ApiExtractor {
    /// Create an extractor using `client`
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Underlying HTTP client
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    async fn fetch_page(&self, request: &FetchRequest, page: Option<(&str, u32, PageLocation)>) -> Result<RawBatch> {
        let mut config = RequestConfig::new();
        config.query = request.query.clone();
        config.body = request.body.clone();

        match page {
            Some((param, number, PageLocation::Query)) => {
                config.query.insert(param.to_string(), number.to_string());
            }
            Some((param, number, PageLocation::Body)) => {
                let body = config
                    .body
                    .get_or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
                let JsonValue::Object(fields) = body else {
                    return Err(Error::config(format!(
                        "Page parameter '{param}' needs a JSON object body"
                    )));
                };
                fields.insert(param.to_string(), JsonValue::from(number));
            }
            None => {}
        }

        self.client
            .request_json(request.method.into(), &request.path, &config)
            .await
    }
}

#[async_trait]
impl Extractor for ApiExtractor {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<RawBatch>> {
        let Pagination::PageNumber {
            param,
            start,
            max_pages,
            location,
        } = &request.pagination
        else {
            let batch = self.fetch_page(request, None).await?;
            return Ok(vec![batch]);
        };

        let mut batches = Vec::new();
        let mut page = *start;
        loop {
            if max_pages.is_some_and(|max| batches.len() >= max as usize) {
                debug!(path = %request.path, max_pages, "Page limit reached");
                break;
            }

            let batch = self
                .fetch_page(request, Some((param.as_str(), page, *location)))
                .await?;
            let records = page_records(&batch, request.record_path.as_deref());
            debug!(path = %request.path, page, records, "Fetched page");
            if records == 0 {
                break;
            }

            batches.push(batch);
            page += 1;
        }

        info!(path = %request.path, pages = batches.len(), "Pagination complete");
        Ok(batches)
    }
}

/// Number of records on a page; zero when the record path is absent
fn page_records(batch: &RawBatch, record_path: Option<&str>) -> usize {
    let records = match record_path {
        Some(key) => batch.get(key),
        None => Some(batch),
    };
    match records {
        Some(JsonValue::Array(items)) => items.len(),
        Some(JsonValue::Object(_)) => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_records() {
        assert_eq!(page_records(&json!({"data": [1, 2]}), Some("data")), 2);
        assert_eq!(page_records(&json!({"data": []}), Some("data")), 0);
        assert_eq!(page_records(&json!({"other": [1]}), Some("data")), 0);
        assert_eq!(page_records(&json!({"data": null}), Some("data")), 0);
        assert_eq!(page_records(&json!({"data": {"id": 1}}), Some("data")), 1);
        assert_eq!(page_records(&json!([1, 2, 3]), None), 3);
    }
}
