//! Book persistence: the `BookStore` contract and its backends.

mod compare;
pub mod memory;
pub mod postgres;

pub use memory::MemoryBookStore;
pub use postgres::{ensure_database_exists, ensure_schema, PgBookStore};

use crate::error::AppError;
use crate::query::{Projection, QuerySpec, ResolvedProjection, TypedPredicate};
use crate::reports::{BookStats, MonthlyPlan, MonthlyPlanReport, StatsReport};
use crate::schema::{BookPatch, NewBook, BOOK_SCHEMA};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

#[async_trait]
pub trait BookStore: Send + Sync {
    /// Name used in readiness output.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), AppError>;

    async fn find(&self, spec: &QuerySpec) -> Result<Vec<Value>, AppError>;

    /// One document with the read projection applied.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Value>, AppError>;

    /// Persist a prepared document; returns it in full, with `id`, `createdAt` and `__v`.
    async fn insert(&self, book: NewBook) -> Result<Value, AppError>;

    /// Merge `patch` into the document; returns the result with the read projection applied.
    async fn update_by_id(&self, id: Uuid, patch: BookPatch) -> Result<Option<Value>, AppError>;

    /// `true` when a document was removed.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, AppError>;

    async fn book_stats(&self, report: &StatsReport) -> Result<Vec<BookStats>, AppError>;

    async fn monthly_plan(&self, report: &MonthlyPlanReport) -> Result<Vec<MonthlyPlan>, AppError>;
}

/// Projection for single-document reads: hidden fields out, `__v` kept.
pub fn read_projection() -> ResolvedProjection {
    Projection::default().resolve(&BOOK_SCHEMA.hidden_fields())
}

pub fn list_projection(spec: &QuerySpec) -> ResolvedProjection {
    spec.projection.resolve(&BOOK_SCHEMA.hidden_fields())
}

pub fn typed_filters(spec: &QuerySpec) -> Result<Vec<TypedPredicate>, AppError> {
    spec.filter.iter().map(|p| p.cast()).collect()
}

pub fn plan_window(report: &MonthlyPlanReport) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    report
        .window()
        .ok_or_else(|| AppError::BadRequest(format!("Year {} is out of range", report.year)))
}
