//! Error types for Solidafy Stage
//!
//! This module defines the error hierarchy for the whole pipeline.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Errors are split by [`Severity`]: recoverable errors skip a file or abort
//! the current window, fatal errors are surfaced to the caller.

use thiserror::Error;

/// The main error type for Solidafy Stage
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Extraction Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Structural Errors
    // ============================================================================
    #[error("Unexpected batch structure at '{path}': {message}")]
    Structure { path: String, message: String },

    #[error("Column length mismatch: column '{column}' has {actual} rows, expected {expected}")]
    RowCount {
        column: String,
        expected: usize,
        actual: usize,
    },

    // ============================================================================
    // Coercion / Staging Errors
    // ============================================================================
    #[error("Coercion failed: {message}")]
    Coercion { message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Staging error: {message}")]
    Staging { message: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    // ============================================================================
    // Load Errors
    // ============================================================================
    #[error("Load of '{dataset}' failed: {message}")]
    Load { dataset: String, message: String },

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    // ============================================================================
    // Template Errors
    // ============================================================================
    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// How far an error is allowed to propagate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Skip the current file, or abort the current window without advancing
    /// the watermark. The process keeps running.
    Recoverable,
    /// Upstream contract violation or broken local setup; the caller must see it.
    Fatal,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a structural error
    pub fn structure(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structure {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a coercion error
    pub fn coercion(message: impl Into<String>) -> Self {
        Self::Coercion {
            message: message.into(),
        }
    }

    /// Create a staging error
    pub fn staging(message: impl Into<String>) -> Self {
        Self::Staging {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a load error
    pub fn load(dataset: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            dataset: dataset.into(),
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Classify this error for propagation decisions
    pub fn severity(&self) -> Severity {
        match self {
            Error::Http(_)
            | Error::HttpStatus { .. }
            | Error::RateLimited { .. }
            | Error::Timeout { .. }
            | Error::Auth { .. }
            | Error::Coercion { .. }
            | Error::Csv(_)
            | Error::Staging { .. }
            | Error::Load { .. }
            | Error::DuckDb(_)
            | Error::Io(_)
            | Error::FileNotFound { .. } => Severity::Recoverable,
            _ => Severity::Fatal,
        }
    }

    /// Check if this error may be skipped over
    pub fn is_recoverable(&self) -> bool {
        self.severity() == Severity::Recoverable
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Result type alias for Solidafy Stage
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| add_context(e.into(), &message.into()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| add_context(e.into(), &f()))
    }
}

/// I/O errors keep their variant so they stay recoverable
fn add_context(inner: Error, message: &str) -> Error {
    match inner {
        Error::Io(e) => Error::Io(std::io::Error::new(e.kind(), format!("{message}: {e}"))),
        other => Error::Other(format!("{message}: {other}")),
    }
}
