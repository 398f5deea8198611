#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use warden_api::app::build_app;
use warden_api::config::{LogFormat, ServerConfig};
use warden_api::state::AppState;
use warden_auth::password::{hash_password_with, Params};
use warden_auth::StaticUserDirectory;
use warden_cache::MemoryKv;
use warden_core::config::AuthConfig;
use warden_core::identity::DirectoryUser;
use warden_db::MemorySessionStore;
use warden_events::EventBus;

pub const PASSWORD: &str = "correct-horse-battery";

pub const ALICE: i64 = 1;
pub const BOB: i64 = 2;
pub const CAROL: i64 = 3;
pub const ADMIN: i64 = 9;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: None,
        redis_url: None,
        redis_namespace: None,
        users_file: None,
        log_format: LogFormat::Text,
        auth: AuthConfig::with_secrets("test-access-secret", "test-refresh-secret"),
    }
}

fn user(id: i64, username: &str, hash: &str, is_active: bool, permissions: &[&str]) -> DirectoryUser {
    DirectoryUser {
        id,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: hash.to_string(),
        is_active,
        role_codes: if permissions.is_empty() {
            vec!["user".to_string()]
        } else {
            vec!["admin".to_string()]
        },
        permission_codes: permissions.iter().map(|p| p.to_string()).collect(),
    }
}

/// Handles to the in-memory backends behind a test app.
pub struct TestApp {
    pub router: Router,
    pub kv: Arc<MemoryKv>,
    pub sessions: Arc<MemorySessionStore>,
}

/// The full application over in-memory stores with four users:
/// `alice` and `bob` (plain users), `carol` (disabled) and `admin`.
pub fn build_test_app() -> TestApp {
    let hash = hash_password_with(PASSWORD, Params::new(1024, 1, 1, None).unwrap()).unwrap();
    let directory = StaticUserDirectory::new(vec![
        user(ALICE, "alice", &hash, true, &[]),
        user(BOB, "bob", &hash, true, &[]),
        user(CAROL, "carol", &hash, false, &[]),
        user(ADMIN, "admin", &hash, true, &["session:revoke", "account:unlock"]),
    ])
    .unwrap();

    let kv = Arc::new(MemoryKv::new());
    let sessions = Arc::new(MemorySessionStore::new());
    let state = AppState::new(
        test_config(),
        sessions.clone(),
        kv.clone(),
        Arc::new(directory),
        Arc::new(EventBus::default()),
    );

    TestApp {
        router: build_app(state).unwrap(),
        kv,
        sessions,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    tokio::time::timeout(Duration::from_secs(30), app.clone().oneshot(request))
        .await
        .expect("request timed out")
        .unwrap()
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    send(app, Method::GET, uri, token, None, &[]).await
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, token, Some(body), &[]).await
}

pub async fn post(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    send(app, Method::POST, uri, token, None, &[]).await
}

pub async fn delete(app: &Router, uri: &str, token: Option<&str>) -> Response<Body> {
    send(app, Method::DELETE, uri, token, None, &[]).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Log in and return the response body; panics unless the login succeeded.
pub async fn login(app: &Router, username: &str) -> serde_json::Value {
    let response = post_json(
        app,
        "/api/v1/auth/login",
        None,
        serde_json::json!({ "username": username, "password": PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), 200, "login as {username} failed");
    body_json(response).await
}

/// Access token from a login / refresh body.
pub fn access(body: &serde_json::Value) -> String {
    body["access_token"].as_str().unwrap().to_string()
}

pub fn refresh_token(body: &serde_json::Value) -> String {
    body["refresh_token"].as_str().unwrap().to_string()
}
