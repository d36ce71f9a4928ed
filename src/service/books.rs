//! Book operations: request data in, store calls out.

use crate::error::AppError;
use crate::query::{self, RequestQuery};
use crate::reports::{BookStats, MonthlyPlan, MonthlyPlanReport, StatsReport};
use crate::schema::{
    apply_defaults, body_to_map, cast_document, derive_slug, BookPatch, NewBook, RequestValidator, BOOK_SCHEMA,
};
use crate::store::BookStore;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Instant;
use uuid::Uuid;

pub const NOT_FOUND_MESSAGE: &str = "A book with specified ID was not found";

fn not_found() -> AppError {
    AppError::NotFound(NOT_FOUND_MESSAGE.into())
}

/// Cast, validate, default and slug a new book, in that order.
pub fn prepare_new(body: Value, now: DateTime<Utc>) -> Result<NewBook, AppError> {
    let doc = cast_document(&BOOK_SCHEMA, body_to_map(body)?)?;
    RequestValidator::validate(&doc, &BOOK_SCHEMA)?;
    let doc = apply_defaults(doc, &BOOK_SCHEMA, now);
    Ok(NewBook(derive_slug(doc)))
}

/// Cast and validate the supplied keys only; re-derive the slug when the name changes.
pub fn prepare_patch(body: Value) -> Result<BookPatch, AppError> {
    let doc = cast_document(&BOOK_SCHEMA, body_to_map(body)?)?;
    RequestValidator::validate_partial(&doc, &BOOK_SCHEMA)?;
    Ok(BookPatch(derive_slug(doc)))
}

pub struct BookService;

impl BookService {
    pub async fn list(store: &dyn BookStore, request: &RequestQuery) -> Result<Vec<Value>, AppError> {
        let spec = query::build(request);
        tracing::debug!(spec = ?spec, "list books");
        let started = Instant::now();
        let docs = store.find(&spec).await?;
        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            results = docs.len(),
            "find took"
        );
        Ok(docs)
    }

    pub async fn get(store: &dyn BookStore, id: Uuid) -> Result<Value, AppError> {
        let started = Instant::now();
        let doc = store.find_by_id(id).await?;
        tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, %id, "find by id took");
        doc.ok_or_else(not_found)
    }

    pub async fn create(store: &dyn BookStore, body: Value) -> Result<Value, AppError> {
        let book = prepare_new(body, Utc::now())?;
        let doc = store.insert(book).await?;
        let id = doc.get("id").cloned().unwrap_or_default();
        tracing::info!(%id, "book created");
        Ok(doc)
    }

    /// A missing id is a 404 whatever the body holds; validation runs only for existing books.
    pub async fn update(store: &dyn BookStore, id: Uuid, body: Value) -> Result<Value, AppError> {
        if store.find_by_id(id).await?.is_none() {
            return Err(not_found());
        }
        let patch = prepare_patch(body)?;
        let started = Instant::now();
        let doc = store.update_by_id(id, patch).await?;
        tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, %id, "find and update took");
        let doc = doc.ok_or_else(not_found)?;
        tracing::info!(%id, "book updated");
        Ok(doc)
    }

    pub async fn delete(store: &dyn BookStore, id: Uuid) -> Result<(), AppError> {
        if !store.delete_by_id(id).await? {
            return Err(not_found());
        }
        tracing::info!(%id, "book deleted");
        Ok(())
    }

    pub async fn stats(store: &dyn BookStore) -> Result<Vec<BookStats>, AppError> {
        let report = StatsReport::default();
        tracing::debug!(report = ?report, "aggregate");
        store.book_stats(&report).await
    }

    pub async fn monthly_plan(store: &dyn BookStore, year: i32) -> Result<Vec<MonthlyPlan>, AppError> {
        let report = MonthlyPlanReport::new(year);
        tracing::debug!(report = ?report, "aggregate");
        store.monthly_plan(&report).await
    }
}
