//! The `read_query` tool.

use crate::db::Executor;
use crate::error::DbResult;
use crate::tools::registry::{ParamSpec, ParamType, ToolArgs, ToolDefinition, ToolHandler};
use crate::tools::sql_validator::{StatementRule, validate_statement};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

pub fn read_query_definition() -> ToolDefinition {
    ToolDefinition::new("read_query", "Execute a read-only SQL query").param(ParamSpec::required(
        "query",
        ParamType::String,
        "The SQL query to execute",
    ))
}

/// Runs a single read-only statement and returns its rows.
///
/// The statement kind is checked before execution, so `read_query` cannot be
/// used to slip a write past the read-only gate.
pub struct ReadQueryTool;

#[async_trait]
impl ToolHandler for ReadQueryTool {
    async fn call(&self, args: &ToolArgs, executor: &dyn Executor) -> DbResult<JsonValue> {
        let sql = args.sql("query")?;
        validate_statement(sql, executor.backend(), StatementRule::ReadOnly)?;

        let result = executor.query(sql).await?;
        debug!(
            row_count = result.row_count,
            truncated = result.truncated,
            "Read query returned rows"
        );
        Ok(serde_json::to_value(result)?)
    }
}
