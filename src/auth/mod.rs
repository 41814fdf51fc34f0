//! Authentication module
//!
//! Supports: None, Basic, Bearer, Session (login endpoint)
//!
//! The `Authenticator` applies auth to requests and caches the session token
//! until it expires.

mod authenticator;
mod types;

pub use authenticator::{extract_path, Authenticator};
pub use types::{AuthConfig, CachedToken};

#[cfg(test)]
mod tests;
