//! Book handlers: list, get, create, update, delete and the two reports.

use crate::error::AppError;
use crate::extractors::{BookId, JsonBody};
use crate::query::RequestQuery;
use crate::response::{success_created, success_many, success_one};
use crate::service::BookService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

pub async fn list(
    State(state): State<AppState>,
    query: RequestQuery,
) -> Result<impl IntoResponse, AppError> {
    let books = BookService::list(state.store.as_ref(), &query).await?;
    Ok(success_many("books", books))
}

pub async fn read(
    State(state): State<AppState>,
    BookId(id): BookId,
) -> Result<impl IntoResponse, AppError> {
    let book = BookService::get(state.store.as_ref(), id).await?;
    Ok(success_one("book", book))
}

pub async fn create(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let book = BookService::create(state.store.as_ref(), body).await?;
    Ok(success_created("book", book))
}

pub async fn update(
    State(state): State<AppState>,
    BookId(id): BookId,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, AppError> {
    let book = BookService::update(state.store.as_ref(), id, body).await?;
    Ok(success_one("book", book))
}

pub async fn delete(
    State(state): State<AppState>,
    BookId(id): BookId,
) -> Result<impl IntoResponse, AppError> {
    BookService::delete(state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let stats = BookService::stats(state.store.as_ref()).await?;
    Ok(success_one("stats", stats))
}

pub async fn monthly_plan(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let year: i32 = year
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid year: {}", year)))?;
    let plan = BookService::monthly_plan(state.store.as_ref(), year).await?;
    Ok(success_one("plan", plan))
}
