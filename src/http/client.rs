//! HTTP client with retry and rate limiting
//!
//! Every request waits for the rate limiter, gets authenticated, and is
//! retried with backoff on timeouts, connection errors and retryable
//! statuses. Client errors fail immediately.

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::auth::{AuthConfig, Authenticator};
use crate::error::{Error, Result};
use crate::types::{BackoffType, JsonValue};
use reqwest::{Client, Method, Response, StatusCode};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for relative paths
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: BTreeMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            rate_limit: Some(RateLimiterConfig::default()),
            default_headers: BTreeMap::new(),
            user_agent: format!("solidafy-stage/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set backoff configuration
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.backoff_type = backoff_type;
        self.config.initial_backoff = initial;
        self.config.max_backoff = max;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters
    pub query: BTreeMap<String, String>,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Request body (JSON)
    pub body: Option<JsonValue>,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }
}

/// HTTP client with retry and rate limiting
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Option<Authenticator>,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            authenticator: None,
            rate_limiter,
        })
    }

    /// Create a client with authentication
    pub fn with_auth(config: HttpClientConfig, auth_config: AuthConfig) -> Result<Self> {
        let mut client = Self::with_config(config)?;
        client.authenticator = Some(Authenticator::with_client(
            auth_config,
            client.client.clone(),
        ));
        Ok(client)
    }

    /// Send a request, retrying transient failures
    pub async fn request(&self, method: Method, url: &str, config: &RequestConfig) -> Result<Response> {
        let full_url = self.build_url(url);
        let max_retries = self.config.max_retries;
        let mut attempt = 0;
        let mut relogged = false;

        loop {
            if let Some(limiter) = &self.rate_limiter {
                limiter.wait().await;
            }

            let mut req = self.client.request(method.clone(), &full_url);
            for (key, value) in self.config.default_headers.iter().chain(&config.headers) {
                req = req.header(key.as_str(), value.as_str());
            }
            if !config.query.is_empty() {
                req = req.query(&config.query);
            }
            if let Some(body) = &config.body {
                req = req.json(body);
            }
            if let Some(auth) = &self.authenticator {
                req = auth.apply(req).await?;
            }

            let failure = match req.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() || status.is_redirection() || status.is_informational() {
                        debug!(%method, url = %full_url, status = status.as_u16(), "Request succeeded");
                        return Ok(response);
                    }
                    if status == StatusCode::UNAUTHORIZED && !relogged {
                        if let Some(auth) = self.authenticator.as_ref().filter(|a| a.is_session()) {
                            warn!(url = %full_url, "Session rejected (401), logging in again");
                            auth.clear_cache().await;
                            relogged = true;
                            continue;
                        }
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let retry_after = extract_retry_after(&response);
                        if attempt < max_retries {
                            warn!(
                                attempt = attempt + 1,
                                max_attempts = max_retries + 1,
                                retry_after,
                                "Rate limited (429), waiting"
                            );
                            tokio::time::sleep(Duration::from_secs(retry_after)).await;
                            attempt += 1;
                            continue;
                        }
                        return Err(Error::RateLimited {
                            retry_after_seconds: retry_after,
                        });
                    }
                    let body = response.text().await.unwrap_or_default();
                    Error::http_status(status.as_u16(), body)
                }
                #[allow(clippy::cast_possible_truncation)]
                Err(e) if e.is_timeout() => Error::Timeout {
                    timeout_ms: self.config.timeout.as_millis() as u64,
                },
                Err(e) if e.is_connect() => Error::Http(e),
                Err(e) => return Err(Error::Http(e)),
            };

            if !failure.is_retryable() || attempt >= max_retries {
                return Err(failure);
            }

            let delay = self.calculate_backoff(attempt);
            warn!(
                attempt = attempt + 1,
                max_attempts = max_retries + 1,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Request failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Send a request and parse the JSON response
    pub async fn request_json(&self, method: Method, url: &str, config: &RequestConfig) -> Result<JsonValue> {
        let response = self.request(method, url, config).await?;
        Ok(response.json().await?)
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            None => path.to_string(),
        }
    }

    /// Calculate backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let initial = self.config.initial_backoff;
        let delay = match self.config.backoff_type {
            BackoffType::Constant => initial,
            BackoffType::Linear => initial.saturating_mul(attempt + 1),
            BackoffType::Exponential => initial.saturating_mul(2u32.saturating_pow(attempt)),
        };

        delay.min(self.config.max_backoff)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_authenticator", &self.authenticator.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Extract retry-after header value in seconds
fn extract_retry_after(response: &Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(60)
}
