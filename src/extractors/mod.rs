//! Request extractors that reject with `AppError`.

mod book_id;
mod json_body;
mod request_query;

pub use book_id::BookId;
pub use json_body::JsonBody;
