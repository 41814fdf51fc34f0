//! Authenticator implementation
//!
//! Applies authentication to requests and caches session tokens.

use super::types::{AuthConfig, CachedToken};
use crate::error::{Error, Result};
use crate::types::JsonValue;
use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Authenticator handles applying authentication to HTTP requests
pub struct Authenticator {
    /// Auth configuration
    config: AuthConfig,
    /// Cached session token
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    /// HTTP client for login requests
    http_client: Client,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: AuthConfig, http_client: Client) -> Self {
        Self {
            config,
            cached_token: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    /// Apply authentication to a request builder
    pub async fn apply(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        match &self.config {
            AuthConfig::None => Ok(req),
            AuthConfig::Basic { username, password } => {
                Ok(req.basic_auth(username, Some(password)))
            }
            AuthConfig::Bearer { token } => Ok(req.bearer_auth(token)),
            AuthConfig::Session {
                token_header,
                token_prefix,
                ..
            } => {
                let token = self.get_or_login().await?;
                let value = format!("{}{token}", token_prefix.as_deref().unwrap_or(""));
                Ok(req.header(token_header.as_str(), value))
            }
        }
    }

    /// Get a valid session token, logging in if necessary
    async fn get_or_login(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
                return Ok(token.token.clone());
            }
        }

        let mut cached = self.cached_token.write().await;

        // Another task may have logged in while we waited for the lock
        if let Some(token) = cached.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.token.clone());
        }

        let token = self.login().await?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn login(&self) -> Result<CachedToken> {
        let AuthConfig::Session {
            login_url,
            login_method,
            login_body,
            token_path,
            expires_in_path,
            ..
        } = &self.config
        else {
            return Err(Error::auth("login requested without session auth"));
        };

        debug!(url = %login_url, "Logging in");
        let response = self
            .http_client
            .request(login_method.clone(), login_url)
            .json(login_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "Login request failed with status {status}: {body}"
            )));
        }

        let body: JsonValue = response.json().await?;

        let token = extract_path(&body, token_path).ok_or_else(|| {
            Error::auth(format!("Could not extract token from path: {token_path}"))
        })?;

        let expires_at = expires_in_path
            .as_deref()
            .and_then(|path| extract_path(&body, path))
            .and_then(|v| v.parse::<i64>().ok())
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

        Ok(CachedToken::new(token, expires_at))
    }

    /// Whether requests carry a session token from a login endpoint
    pub fn is_session(&self) -> bool {
        matches!(self.config, AuthConfig::Session { .. })
    }

    /// Clear the cached token (forces a new login)
    pub async fn clear_cache(&self) {
        *self.cached_token.write().await = None;
    }
}

/// Extract a scalar from JSON by dotted path; a leading `$.` is allowed
pub fn extract_path(value: &JsonValue, path: &str) -> Option<String> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        current = current.as_object()?.get(part)?;
    }

    match current {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
