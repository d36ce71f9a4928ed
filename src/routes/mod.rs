//! Router assembly: common routes, the book resource under its base path, fallback and layers.

mod books;
mod common;

pub use books::book_routes;
pub use common::common_routes;

use crate::error::AppError;
use crate::settings::Settings;
use crate::state::AppState;
use axum::{http::Uri, Router};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Can't find {} on this server!", uri))
}

pub fn app(state: AppState, settings: &Settings) -> Router {
    Router::new()
        .merge(common_routes())
        .nest(&settings.books_base_path, book_routes(settings.monthly_plan_enabled))
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(settings.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
