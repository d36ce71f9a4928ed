//! Shared helpers: a router over a seeded memory store, driven with `oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use book_api::{app, AppState, MemoryBookStore, Settings};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const BASE: &str = "/api/v1/books";

pub fn router(store: MemoryBookStore, monthly_plan_enabled: bool) -> Router {
    let settings = Settings {
        monthly_plan_enabled,
        ..Settings::default()
    };
    app(AppState::new(Arc::new(store)), &settings)
}

pub fn empty_router() -> Router {
    router(MemoryBookStore::new(), false)
}

/// Send one request; returns the status and the JSON body (`Null` when empty).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send_request(app, request).await
}

pub async fn send_request(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

pub fn valid_book(name: &str) -> Value {
    json!({
        "name": name,
        "department": "Computer Science",
        "summary": "A book about programs."
    })
}

/// Twelve books with distinct prices and creation times; book `n` is created on day `n`.
pub fn catalogue() -> MemoryBookStore {
    MemoryBookStore::with_documents((1..=12).map(|n| {
        json!({
            "id": format!("00000000-0000-0000-0000-{:012}", n),
            "createdAt": format!("2021-01-{:02}T00:00:00.000Z", n),
            "__v": 0,
            "name": format!("Book {:02}", n),
            "slug": format!("book-{:02}", n),
            "department": "Marketing",
            "summary": "Seeded.",
            "price": (n * 7) % 13,
            "year": "2021-01-01T00:00:00.000Z"
        })
    }))
}

pub fn names(body: &Value) -> Vec<String> {
    body["data"]["books"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap_or_default().to_string())
        .collect()
}
