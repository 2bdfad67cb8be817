//! Database access layer.
//!
//! - `pool`: database-specific sqlx pools
//! - `executor`: the [`Executor`] trait and its sqlx implementation
//! - `schema`: database, table and column introspection
//! - `types`: row decoding into JSON values

pub mod executor;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::{Executor, SqlExecutor, filter_names};
pub use pool::{DbPool, PoolSettings};
pub use schema::SchemaInspector;
