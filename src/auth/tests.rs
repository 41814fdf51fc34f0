//! Tests for the auth module

use super::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session(server: &MockServer, expires_in_path: Option<&str>) -> AuthConfig {
    AuthConfig::Session {
        login_url: format!("{}/auth/login", server.uri()),
        login_method: reqwest::Method::POST,
        login_body: json!({ "username": "svc", "password": "hunter2" }),
        token_path: "result.atoken".to_string(),
        token_header: "authorization".to_string(),
        token_prefix: None,
        expires_in_path: expires_in_path.map(str::to_string),
    }
}

async fn header_after_apply(auth: &Authenticator, name: &str) -> Option<String> {
    let req = reqwest::Client::new().get("https://example.com/api");
    let built = auth.apply(req).await.unwrap().build().unwrap();
    built
        .headers()
        .get(name)
        .map(|v| v.to_str().unwrap().to_string())
}

#[tokio::test]
async fn test_no_auth() {
    let auth = Authenticator::new(AuthConfig::None);
    assert!(header_after_apply(&auth, "authorization").await.is_none());
}

#[tokio::test]
async fn test_basic_auth() {
    let auth = Authenticator::new(AuthConfig::Basic {
        username: "user".to_string(),
        password: "pass".to_string(),
    });

    // base64("user:pass")
    assert_eq!(
        header_after_apply(&auth, "authorization").await.unwrap(),
        "Basic dXNlcjpwYXNz"
    );
}

#[tokio::test]
async fn test_bearer_auth() {
    let auth = Authenticator::new(AuthConfig::Bearer {
        token: "my-bearer-token".to_string(),
    });
    assert_eq!(
        header_after_apply(&auth, "authorization").await.unwrap(),
        "Bearer my-bearer-token"
    );
}

#[tokio::test]
async fn test_session_auth_sends_raw_token_in_header() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "username": "svc", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "atoken": "session-token-xyz" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = Authenticator::new(session(&server, None));

    assert_eq!(
        header_after_apply(&auth, "authorization").await.unwrap(),
        "session-token-xyz"
    );
    // Cached: no second login
    assert_eq!(
        header_after_apply(&auth, "authorization").await.unwrap(),
        "session-token-xyz"
    );
}

#[tokio::test]
async fn test_session_auth_with_prefix() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "atoken": "abc" }
        })))
        .mount(&server)
        .await;

    let AuthConfig::Session {
        login_url,
        login_method,
        login_body,
        token_path,
        expires_in_path,
        ..
    } = session(&server, None)
    else {
        unreachable!()
    };
    let auth = Authenticator::new(AuthConfig::Session {
        login_url,
        login_method,
        login_body,
        token_path,
        token_header: "X-Token".to_string(),
        token_prefix: Some("Token ".to_string()),
        expires_in_path,
    });

    assert_eq!(
        header_after_apply(&auth, "X-Token").await.unwrap(),
        "Token abc"
    );
}

#[tokio::test]
async fn test_expired_session_logs_in_again() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "atoken": "short-lived", "ttl": 10 }
        })))
        .expect(2)
        .mount(&server)
        .await;

    // 10s lifetime is inside the 30s expiry buffer
    let auth = Authenticator::new(session(&server, Some("result.ttl")));
    header_after_apply(&auth, "authorization").await;
    header_after_apply(&auth, "authorization").await;
}

#[tokio::test]
async fn test_clear_cache() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": { "atoken": "t" }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let auth = Authenticator::new(session(&server, None));
    header_after_apply(&auth, "authorization").await;
    auth.clear_cache().await;
    header_after_apply(&auth, "authorization").await;
}

#[tokio::test]
async fn test_session_login_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let auth = Authenticator::new(session(&server, None));
    let req = reqwest::Client::new().get("https://example.com/api");
    let err = auth.apply(req).await.unwrap_err();

    assert!(err.to_string().contains("401"));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_session_missing_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": {} })))
        .mount(&server)
        .await;

    let auth = Authenticator::new(session(&server, None));
    let req = reqwest::Client::new().get("https://example.com/api");
    let err = auth.apply(req).await.unwrap_err();
    assert!(err.to_string().contains("result.atoken"));
}

#[test]
fn test_extract_path() {
    let value = json!({ "data": { "token": "abc", "ttl": 60, "ok": true, "list": [] } });

    assert_eq!(extract_path(&value, "data.token"), Some("abc".to_string()));
    assert_eq!(extract_path(&value, "$.data.ttl"), Some("60".to_string()));
    assert_eq!(extract_path(&value, "data.ok"), Some("true".to_string()));
    assert_eq!(extract_path(&value, "data.list"), None);
    assert_eq!(extract_path(&value, "data.missing"), None);
}
