//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use ledger_books::api::{self, AppState, PagingConfig};
use ledger_books::storage::{MemoryStorage, Storage};
use serde_json::Value;
use tower::util::ServiceExt;

/// Full application over fresh in-memory storage
pub fn memory_app() -> (Router, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let app = app_with(storage.clone());
    (app, storage)
}

pub fn app_with(storage: Arc<dyn Storage>) -> Router {
    api::build_app(AppState::new(storage, PagingConfig::default()))
}

/// Send a request and return status, headers and raw body
pub async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes.to_vec())
}

/// Send a request and decode the JSON response
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, _, bytes) = send_raw(app, method, uri, body).await;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Create a user through the API and return its id
pub async fn create_user(app: &Router, username: &str) -> i64 {
    let (status, json) = send(
        app,
        "POST",
        "/api/user",
        Some(serde_json::json!({ "username": username })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "user creation failed: {json}");
    json["id"].as_i64().unwrap()
}

/// Create an account through the API and return its id
pub async fn create_account(app: &Router, name: &str, user_id: i64) -> i64 {
    let (status, json) = send(
        app,
        "PUT",
        "/api/account",
        Some(serde_json::json!({ "name": name, "userId": user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "account creation failed: {json}");
    json["id"].as_i64().unwrap()
}

/// Record a transaction through the API and return its id
pub async fn record(app: &Router, account_id: i64, user_id: i64, amount: &str, kind: &str) -> i64 {
    let (status, json) = send(
        app,
        "POST",
        "/api/transaction",
        Some(serde_json::json!({
            "amount": amount,
            "type": kind,
            "accountId": account_id,
            "userId": user_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "transaction failed: {json}");
    json["id"].as_i64().unwrap()
}
