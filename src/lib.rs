//! Book API: REST CRUD and reports for a book catalogue kept as JSON documents.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod query;
pub mod reports;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use error::{install_environment, AppError, ConfigError};
pub use routes::{app, book_routes, common_routes};
pub use service::BookService;
pub use settings::{Environment, Settings, StorageBackend};
pub use state::AppState;
pub use store::{BookStore, MemoryBookStore, PgBookStore};
