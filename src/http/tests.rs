//! Tests for the HTTP client module

use super::*;
use crate::auth::AuthConfig;
use crate::error::Error;
use crate::types::BackoffType;
use reqwest::Method;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_client(server: &MockServer, max_retries: u32) -> HttpClient {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .max_retries(max_retries)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(10),
            Duration::from_secs(1),
        )
        .no_rate_limit()
        .build();
    HttpClient::with_config(config).unwrap()
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.max_retries, 3);
    assert!(config.base_url.is_none());
    assert!(config.rate_limit.is_some());
    assert!(config.user_agent.starts_with("solidafy-stage/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://api.example.com")
        .timeout(Duration::from_secs(60))
        .max_retries(5)
        .backoff(
            BackoffType::Linear,
            Duration::from_millis(200),
            Duration::from_secs(30),
        )
        .header("X-Custom", "value")
        .rate_limit(RateLimiterConfig::new(2, 4))
        .build();

    assert_eq!(config.base_url.as_deref(), Some("https://api.example.com"));
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.backoff_type, BackoffType::Linear);
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::new(2, 4)));
    assert_eq!(
        config.default_headers.get("X-Custom").map(String::as_str),
        Some("value")
    );
}

// ============================================================================
// Request Tests
// ============================================================================

#[tokio::test]
async fn test_request_json_with_query_and_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/counts"))
        .and(query_param("storeId", "42"))
        .and(query_param("page", "1"))
        .and(header("X-Request", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [1, 2]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = fast_client(&server, 0);
    let request = RequestConfig::new()
        .query("storeId", "42")
        .query("page", "1")
        .header("X-Request", "abc");

    let body = client
        .request_json(Method::GET, "/api/v1/counts", &request)
        .await
        .unwrap();
    assert_eq!(body, json!({"data": [1, 2]}));
}

#[tokio::test]
async fn test_post_with_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/search"))
        .and(wiremock::matchers::body_json(json!({"from": "2024-01-01"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let client = fast_client(&server, 0);
    let request = RequestConfig::new().json(json!({"from": "2024-01-01"}));
    let body = client
        .request_json(Method::POST, "api/search", &request)
        .await
        .unwrap();
    assert_eq!(body["ok"], json!(true));
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .expect(1)
        .mount(&server)
        .await;

    let client = fast_client(&server, 3);
    let err = client
        .request(Method::GET, "/missing", &RequestConfig::new())
        .await
        .unwrap_err();

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "Not Found");
        }
        other => panic!("Expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_retry_on_500() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let client = fast_client(&server, 3);
    let response = client
        .request(Method::GET, "/flaky", &RequestConfig::new())
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_retries_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(3)
        .mount(&server)
        .await;

    let client = fast_client(&server, 2);
    let err = client
        .request(Method::GET, "/down", &RequestConfig::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_rate_limit_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = fast_client(&server, 2);
    let response = client
        .request(Method::GET, "/limited", &RequestConfig::new())
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_rate_limited_without_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let client = fast_client(&server, 0);
    let err = client
        .request(Method::GET, "/limited", &RequestConfig::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::RateLimited {
            retry_after_seconds: 7
        }
    ));
}

#[tokio::test]
async fn test_auth_is_applied() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/secure"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .no_rate_limit()
        .build();
    let client = HttpClient::with_auth(
        config,
        AuthConfig::Bearer {
            token: "tok".to_string(),
        },
    )
    .unwrap();

    client
        .request(Method::GET, "/secure", &RequestConfig::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_expired_session_logs_in_again() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"atoken": "old"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"atoken": "new"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .and(header("authorization", "old"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .and(header("authorization", "new"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .max_retries(0)
        .no_rate_limit()
        .build();
    let client = HttpClient::with_auth(
        config,
        AuthConfig::Session {
            login_url: format!("{}/login", server.uri()),
            login_method: Method::POST,
            login_body: json!({"username": "u", "password": "p"}),
            token_path: "atoken".to_string(),
            token_header: "authorization".to_string(),
            token_prefix: None,
            expires_in_path: None,
        },
    )
    .unwrap();

    client
        .request(Method::GET, "/data", &RequestConfig::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_second_unauthorized_is_returned() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"atoken": "tok"})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .max_retries(3)
        .no_rate_limit()
        .build();
    let client = HttpClient::with_auth(
        config,
        AuthConfig::Session {
            login_url: format!("{}/login", server.uri()),
            login_method: Method::POST,
            login_body: json!({}),
            token_path: "atoken".to_string(),
            token_header: "authorization".to_string(),
            token_prefix: None,
            expires_in_path: None,
        },
    )
    .unwrap();

    let err = client
        .request(Method::GET, "/data", &RequestConfig::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
}

// ============================================================================
// Backoff Tests
// ============================================================================

fn client_with_backoff(backoff: BackoffType) -> HttpClient {
    let config = HttpClientConfig::builder()
        .backoff(backoff, Duration::from_millis(100), Duration::from_secs(1))
        .build();
    HttpClient::with_config(config).unwrap()
}

#[test]
fn test_calculate_backoff() {
    let constant = client_with_backoff(BackoffType::Constant);
    assert_eq!(constant.calculate_backoff(3), Duration::from_millis(100));

    let linear = client_with_backoff(BackoffType::Linear);
    assert_eq!(linear.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(linear.calculate_backoff(2), Duration::from_millis(300));

    let exponential = client_with_backoff(BackoffType::Exponential);
    assert_eq!(exponential.calculate_backoff(0), Duration::from_millis(100));
    assert_eq!(exponential.calculate_backoff(3), Duration::from_millis(800));
    // Capped at max
    assert_eq!(exponential.calculate_backoff(10), Duration::from_secs(1));
    assert_eq!(exponential.calculate_backoff(40), Duration::from_secs(1));
}

#[test]
fn test_http_client_debug() {
    let client = client_with_backoff(BackoffType::Constant);
    let debug = format!("{client:?}");
    assert!(debug.contains("has_rate_limiter: true"));
}
