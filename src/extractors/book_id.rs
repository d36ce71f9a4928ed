//! Book id from the `:id` path segment.

use crate::error::AppError;
use crate::service::NOT_FOUND_MESSAGE;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use uuid::Uuid;

/// A path id that parses as a UUID. Anything else cannot name a stored book, so it is a 404.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BookId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for BookId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::NotFound(NOT_FOUND_MESSAGE.into()))?;
        Uuid::parse_str(raw.trim())
            .map(BookId)
            .map_err(|_| AppError::NotFound(NOT_FOUND_MESSAGE.into()))
    }
}
