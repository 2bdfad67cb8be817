//! Data models shared by the executor and the tool handlers.

pub mod connection;
pub mod query;
pub mod schema;

pub use connection::DatabaseType;
pub use query::{DEFAULT_MAX_ROWS, ExecuteResult, QueryResult};
pub use schema::ColumnInfo;
