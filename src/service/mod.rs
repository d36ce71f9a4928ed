//! BookService: book operations over any `BookStore`.

mod books;
pub use books::{prepare_new, prepare_patch, BookService, NOT_FOUND_MESSAGE};
