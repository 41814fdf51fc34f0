//! Auth configuration types
//!
//! These types represent the runtime auth configuration after template
//! interpolation has been applied.

use crate::types::JsonValue;
use chrono::{DateTime, Utc};

/// Authentication configuration (after template interpolation)
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// HTTP Basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },

    /// Bearer token authentication
    Bearer {
        /// The bearer token
        token: String,
    },

    /// Session-based authentication (login endpoint)
    Session {
        /// Login endpoint URL
        login_url: String,
        /// HTTP method for login (POST by default)
        login_method: reqwest::Method,
        /// Login request body, already rendered
        login_body: JsonValue,
        /// Dotted path to the token in the login response
        token_path: String,
        /// Header carrying the token
        token_header: String,
        /// Prefix for token value (e.g., "Bearer ")
        token_prefix: Option<String>,
        /// Dotted path to the token lifetime in seconds
        expires_in_path: Option<String>,
    },
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        Self::new(token, Some(Utc::now() + chrono::Duration::seconds(seconds)))
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Utc::now() + chrono::Duration::seconds(30) >= expires_at)
    }
}
