//! SQLite persistence: connection handling, schema migrations and row decoding.

mod database;
mod error;
pub(crate) mod row_helpers;
pub mod schema;

pub use database::Database;
pub use error::StoreError;
