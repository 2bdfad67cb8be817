//! MySQL MCP Server Library
//!
//! This library exposes a MySQL database (PostgreSQL and SQLite through a
//! full DSN) to AI assistants as a fixed catalog of MCP tools, with a global
//! read-only policy that disables the mutating ones.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod policy;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::{DbService, Dispatcher};
pub use policy::PolicyGate;
