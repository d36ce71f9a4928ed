//! SQL for the Postgres store: fixed identifiers, every value a parameter.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
