//! MCP server integration module.
//!
//! `dispatch` holds the transport-independent pipeline; `service` adapts it
//! to rmcp's `ServerHandler`.

pub mod dispatch;
pub mod service;

pub use dispatch::{Dispatcher, Lifecycle};
pub use service::{DbService, SERVER_NAME};
