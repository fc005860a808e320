//! Shared helpers for the integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tower::ServiceExt;

use linkcut::config::Config;
use linkcut::database::RedbStore;
use linkcut::route::create_app;
use linkcut::state::AppState;

/// Configuration for tests: cheap password hashing, default limits
pub fn test_config() -> Config {
    Config {
        bcrypt_cost: 4,
        jwt_secret: "integration-secret".to_string(),
        ..Config::default()
    }
}

/// Creates a test application with a temporary database
pub fn setup_test_app() -> (Router, NamedTempFile) {
    setup_test_app_with(test_config())
}

pub fn setup_test_app_with(config: Config) -> (Router, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let store = RedbStore::open(temp_db.path().to_str().unwrap())
        .expect("Failed to initialize test database");
    (create_app(AppState::new(store, config)), temp_db)
}

/// Parses a response body as JSON
pub async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

/// Registers an account and returns its access token
pub async fn sign_up_and_in(app: &Router, email: &str) -> String {
    let credentials = json!({ "email": email, "password": "password" });

    let response = send(app, "POST", "/auth/sign-up", None, Some(credentials.clone())).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(app, "POST", "/auth/sign-in", None, Some(credentials)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response.into_body()).await;
    body["accessToken"].as_str().unwrap().to_string()
}

/// Creates a link as the token's owner and returns the response body
pub async fn create_link(app: &Router, token: &str, payload: Value) -> Value {
    let response = send(app, "POST", "/urls", Some(token), Some(payload)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response.into_body()).await
}
