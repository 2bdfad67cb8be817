//! Schema introspection tools.
//!
//! - `list_database`: names of the databases on the server
//! - `list_table`: table names of the current database, optionally filtered
//! - `desc_table`: column metadata of one table

use crate::db::Executor;
use crate::error::DbResult;
use crate::tools::registry::{ParamSpec, ParamType, ToolArgs, ToolDefinition, ToolHandler};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

pub fn list_database_definition() -> ToolDefinition {
    ToolDefinition::new("list_database", "List all databases in the MySQL server")
}

pub fn list_table_definition() -> ToolDefinition {
    ToolDefinition::new("list_table", "List all tables in the MySQL server").param(
        ParamSpec::optional(
            "name",
            ParamType::String,
            "If provided, list tables with the specified name",
        ),
    )
}

pub fn desc_table_definition() -> ToolDefinition {
    ToolDefinition::new("desc_table", "Describe the structure of a table").param(
        ParamSpec::required("name", ParamType::String, "The name of the table to describe"),
    )
}

pub struct ListDatabasesTool;

#[async_trait]
impl ToolHandler for ListDatabasesTool {
    async fn call(&self, _args: &ToolArgs, executor: &dyn Executor) -> DbResult<JsonValue> {
        let databases = executor.list_databases().await?;
        debug!(count = databases.len(), "Listed databases");
        Ok(serde_json::to_value(databases)?)
    }
}

/// Lists tables whose name contains `name` (case-sensitive). An empty or
/// absent filter lists every table.
pub struct ListTablesTool;

#[async_trait]
impl ToolHandler for ListTablesTool {
    async fn call(&self, args: &ToolArgs, executor: &dyn Executor) -> DbResult<JsonValue> {
        let filter = args.str("name").map(str::trim).filter(|f| !f.is_empty());
        let tables = executor.list_tables(filter).await?;
        debug!(count = tables.len(), filter = ?filter, "Listed tables");
        Ok(serde_json::to_value(tables)?)
    }
}

pub struct DescribeTableTool;

#[async_trait]
impl ToolHandler for DescribeTableTool {
    async fn call(&self, args: &ToolArgs, executor: &dyn Executor) -> DbResult<JsonValue> {
        let name = args.required_str("name")?.trim();
        if name.is_empty() {
            return Err(crate::error::DbError::invalid_input("'name' must not be empty"));
        }
        let columns = executor.describe_table(name).await?;
        Ok(serde_json::to_value(columns)?)
    }
}
