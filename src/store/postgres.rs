//! PostgreSQL store: one `books` table with the document in a JSONB column.

use super::{list_projection, plan_window, read_projection, typed_filters, BookStore};
use crate::error::{AppError, ConfigError};
use crate::query::QuerySpec;
use crate::reports::{BookStats, MonthlyPlan, MonthlyPlanReport, StatsReport};
use crate::schema::{BookPatch, NewBook};
use crate::sql::{self, PgBindValue, QueryBuf, TABLE};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{ConnectOptions, PgPool, Postgres, Row};
use std::str::FromStr;
use uuid::Uuid;

pub struct PgBookStore {
    pool: PgPool,
}

impl PgBookStore {
    pub fn new(pool: PgPool) -> Self {
        PgBookStore { pool }
    }

    /// Create the database and table when missing, then open a pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        ensure_database_exists(database_url).await?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        ensure_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    async fn fetch_docs(&self, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        let rows = prepared(q).fetch_all(&self.pool).await?;
        rows.iter().map(doc_column).collect()
    }

    async fn fetch_doc(&self, q: &QueryBuf) -> Result<Option<Value>, AppError> {
        let row = prepared(q).fetch_optional(&self.pool).await?;
        row.as_ref().map(doc_column).transpose()
    }
}

fn prepared(q: &QueryBuf) -> sqlx::query::Query<'_, Postgres, PgArguments> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    q.params
        .iter()
        .fold(sqlx::query(&q.sql), |query, p| query.bind(PgBindValue::from_json(p)))
}

fn doc_column(row: &PgRow) -> Result<Value, AppError> {
    Ok(row.try_get::<Value, _>("doc")?)
}

fn stats_row(row: &PgRow) -> Result<BookStats, AppError> {
    Ok(BookStats {
        difficulty: row.try_get("difficulty")?,
        num_books: row.try_get("num_books")?,
        num_ratings: row.try_get("num_ratings")?,
        avg_rating: row.try_get("avg_rating")?,
        avg_price: row.try_get("avg_price")?,
        min_price: row.try_get("min_price")?,
        max_price: row.try_get("max_price")?,
    })
}

fn plan_row(row: &PgRow) -> Result<MonthlyPlan, AppError> {
    let books = match row.try_get::<Value, _>("books")? {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    Ok(MonthlyPlan {
        num_book_starts: row.try_get("num_book_starts")?,
        books,
        month: row.try_get("month")?,
    })
}

#[async_trait]
impl BookStore for PgBookStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn find(&self, spec: &QuerySpec) -> Result<Vec<Value>, AppError> {
        let filters = typed_filters(spec)?;
        let q = sql::select_books(&filters, &spec.sort, &list_projection(spec), spec.skip, spec.limit);
        self.fetch_docs(&q).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Value>, AppError> {
        self.fetch_doc(&sql::select_by_id(&id, &read_projection())).await
    }

    async fn insert(&self, book: NewBook) -> Result<Value, AppError> {
        let q = sql::insert(&Uuid::new_v4(), &book.0);
        self.fetch_doc(&q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update_by_id(&self, id: Uuid, patch: BookPatch) -> Result<Option<Value>, AppError> {
        self.fetch_doc(&sql::update(&id, &patch.0, &read_projection())).await
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, AppError> {
        let row = prepared(&sql::delete(&id)).fetch_optional(&self.pool).await?;
        Ok(row.is_some())
    }

    async fn book_stats(&self, report: &StatsReport) -> Result<Vec<BookStats>, AppError> {
        let rows = prepared(&sql::book_stats(report)).fetch_all(&self.pool).await?;
        rows.iter().map(stats_row).collect()
    }

    async fn monthly_plan(&self, report: &MonthlyPlanReport) -> Result<Vec<MonthlyPlan>, AppError> {
        let (start, end) = plan_window(report)?;
        let rows = prepared(&sql::monthly_plan(report, start, end))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(plan_row).collect()
    }
}

/// Create the books table, its index and the start-date parser if missing. Idempotent.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), AppError> {
    let ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id UUID PRIMARY KEY,
            doc JSONB NOT NULL DEFAULT '{{}}'::jsonb,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            version BIGINT NOT NULL DEFAULT 0
        )
        "#,
        quote_ident(TABLE)
    );
    sqlx::query(&ddl).execute(pool).await?;
    let index = format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} (created_at)",
        quote_ident(&format!("{}_created_at_idx", TABLE)),
        quote_ident(TABLE)
    );
    sqlx::query(&index).execute(pool).await?;
    sqlx::query(&sql::start_date_function()).execute(pool).await?;
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url).map_err(|_| {
        ConfigError::Invalid {
            key: "DATABASE_URL",
            value: database_url.to_string(),
        }
    })?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let invalid = || ConfigError::Invalid {
        key: "DATABASE_URL",
        value: url.to_string(),
    };
    let scheme_end = url.find("://").ok_or_else(invalid)? + 3;
    let path_start = url[scheme_end..].find('/').ok_or_else(invalid)? + scheme_end + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
