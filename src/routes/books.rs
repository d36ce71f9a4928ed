//! Book resource routes, relative to the configured base path.

use crate::handlers::books::{create, delete, list, monthly_plan, read, stats, update};
use crate::state::AppState;
use axum::{routing::get, Router};

/// `/`, `/book-stats` and `/:id`, plus `/monthly-plan/:year` when enabled.
pub fn book_routes(monthly_plan_enabled: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/", get(list).post(create))
        .route("/book-stats", get(stats))
        .route("/:id", get(read).patch(update).delete(delete));
    if monthly_plan_enabled {
        router.route("/monthly-plan/:year", get(monthly_plan))
    } else {
        router
    }
}
