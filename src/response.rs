//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use std::collections::BTreeMap;

/// `{status: "success", results?, data: {<key>: ...}}`.
#[derive(Serialize)]
pub struct Success<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
    pub data: BTreeMap<&'static str, T>,
}

fn envelope<T: Serialize>(key: &'static str, data: T, results: Option<usize>) -> Success<T> {
    Success {
        status: "success",
        results,
        data: BTreeMap::from([(key, data)]),
    }
}

pub fn success_one<T: Serialize>(key: &'static str, data: T) -> (StatusCode, Json<Success<T>>) {
    (StatusCode::OK, Json(envelope(key, data, None)))
}

pub fn success_created<T: Serialize>(key: &'static str, data: T) -> (StatusCode, Json<Success<T>>) {
    (StatusCode::CREATED, Json(envelope(key, data, None)))
}

/// List envelope; `results` is the number of items returned.
pub fn success_many<T: Serialize>(key: &'static str, data: Vec<T>) -> (StatusCode, Json<Success<Vec<T>>>) {
    let results = data.len();
    (StatusCode::OK, Json(envelope(key, data, Some(results))))
}
