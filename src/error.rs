//! Typed errors and HTTP mapping.

use crate::settings::Environment;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
    #[error("unsupported DATABASE_URL scheme: {0}")]
    UnsupportedDatabaseUrl(String),
}

/// One rejected field of a write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field error of one write, reported together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationErrors {
    pub model: &'static str,
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new(model: &'static str) -> Self {
        ValidationErrors {
            model,
            errors: Vec::new(),
        }
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation failed", self.model)?;
        for (i, e) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { ", " };
            write!(f, "{}{}: {}", sep, e.field, e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

/// SQLSTATEs raised when PostgreSQL cannot cast a bound value (bad number, bad date, out of range).
const CAST_SQLSTATES: &[&str] = &["22P02", "22007", "22008", "22003"];

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Db(e) => {
                if is_cast_error(e) {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }
    }
}

fn is_cast_error(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => db
            .code()
            .map(|code| CAST_SQLSTATES.contains(&code.as_ref()))
            .unwrap_or(false),
        _ => false,
    }
}

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

/// Record the runtime environment; production hides internal error messages. First call wins.
pub fn install_environment(environment: Environment) {
    let _ = ENVIRONMENT.set(environment);
}

fn environment() -> Environment {
    ENVIRONMENT.get().copied().unwrap_or_default()
}

#[derive(Serialize)]
pub struct ErrorBody {
    /// `fail` for client errors, `error` for server errors.
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let errors = match &self {
            AppError::Validation(v) => v.errors.clone(),
            _ => Vec::new(),
        };
        let body = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            let message = match environment() {
                Environment::Production => "Something went wrong".to_string(),
                Environment::Development => self.to_string(),
            };
            ErrorBody {
                status: "error",
                message,
                errors,
            }
        } else {
            let message = match &self {
                AppError::Db(sqlx::Error::Database(db)) => format!("Invalid input data: {}", db.message()),
                other => other.to_string(),
            };
            ErrorBody {
                status: "fail",
                message,
                errors,
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_field() {
        let mut errors = ValidationErrors::new("Book");
        errors.push("name", "A book must have a name");
        errors.push("department", "department is either: Marketing, Accounting");
        assert_eq!(
            errors.to_string(),
            "Book validation failed: name: A book must have a name, department: department is either: Marketing, Accounting"
        );
    }

    #[test]
    fn empty_collection_is_ok() {
        assert!(ValidationErrors::new("Book").into_result().is_ok());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Validation(ValidationErrors::new("Book")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Db(sqlx::Error::PoolTimedOut).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message_is_passed_through_verbatim() {
        let e = AppError::NotFound("A book with specified ID was not found".into());
        assert_eq!(e.to_string(), "A book with specified ID was not found");
    }
}
