#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use okrfolio_server::app;
use okrfolio_server::config::ServerConfig;
use okrfolio_server::state::AppState;
use okrfolio_storage::PortfolioStore;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_PASSWORD: &str = "password123";

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

pub async fn build_test_context() -> Result<TestContext> {
    okrfolio_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    let mut config = ServerConfig::default();
    config.database.data_dir = temp_dir.path().to_string_lossy().to_string();
    config.auth.bcrypt_cost = 4;

    let store = PortfolioStore::new(
        &config.database.connection_url(),
        temp_dir.path(),
    )
    .await?
    .with_password_cost(config.auth.bcrypt_cost);

    let state = AppState {
        store: Arc::new(store),
        start_time: Utc::now(),
        jwt_secret: Arc::new(TEST_SECRET.to_string()),
        token_expire_secs: 3600,
        config: Arc::new(config),
    };

    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder = builder.header("Content-Type", "application/json");

    let req_body = body.unwrap_or(Value::Null).to_string();
    let req = builder
        .body(Body::from(req_body))
        .expect("request should build");
    send(app, req).await
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let req = builder.body(Body::empty()).expect("request should build");
    send(app, req).await
}

/// Request with a raw `Authorization` header value.
pub async fn request_with_authorization(
    app: &axum::Router,
    uri: &str,
    authorization: &str,
) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .header("Authorization", authorization)
        .body(Body::empty())
        .expect("request should build");
    send(app, req).await
}

pub async fn register_and_get_token(app: &axum::Router, email: &str) -> String {
    let (status, body, _) = request_json(
        app,
        "POST",
        "/v1/auth/register",
        None,
        Some(json!({"email": email, "password": TEST_PASSWORD, "name": "Tester"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["err_code"], 0);
    body["data"]["token"]
        .as_str()
        .expect("token should exist")
        .to_string()
}

/// Creates a project with the required fields and returns its id.
pub async fn create_project(app: &axum::Router, token: &str, body: Value) -> String {
    let (status, body, _) = request_json(app, "POST", "/v1/projects", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create project failed: {body}");
    body["data"]["id"]
        .as_str()
        .expect("project id should exist")
        .to_string()
}

pub fn project_body(title: &str, status: &str, priority: &str, progress: i64) -> Value {
    json!({
        "title": title,
        "category": "work",
        "status": status,
        "priority": priority,
        "progress": progress,
    })
}

pub fn assert_ok_envelope(json: &Value) {
    assert_eq!(json["err_code"], 0);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
}

pub fn assert_err_envelope(json: &Value, err_code: i32) {
    assert_eq!(json["err_code"], err_code);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
    assert!(json.get("data").is_some());
    assert!(json["data"].is_null());
}

/// 400 envelope whose `data.errors` names the given fields.
pub fn assert_validation_errors(json: &Value, fields: &[&str]) {
    assert_eq!(json["err_code"], 1001);
    let errors = json["data"]["errors"]
        .as_array()
        .expect("validation errors should be an array");
    let named: Vec<&str> = errors
        .iter()
        .filter_map(|e| e["field"].as_str())
        .collect();
    for field in fields {
        assert!(named.contains(field), "missing error for {field} in {json}");
    }
}

pub fn decode_data<T: DeserializeOwned>(json: &Value) -> T {
    serde_json::from_value(json["data"].clone()).expect("data should decode")
}
