//! Mutating tools: `create_table`, `write_query`, `update_query` and
//! `delete_query`.
//!
//! All four share one handler parameterised by the statement kind it accepts.
//! The read-only gate runs before any of them; the statement check here only
//! makes sure each tool runs the kind of statement its name promises.

use crate::db::Executor;
use crate::error::DbResult;
use crate::models::ExecuteResult;
use crate::tools::registry::{ParamSpec, ParamType, ToolArgs, ToolDefinition, ToolHandler};
use crate::tools::sql_validator::{StatementRule, validate_statement};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::info;

const QUERY_PARAM_DESCRIPTION: &str = "The SQL query to execute";

pub fn create_table_definition() -> ToolDefinition {
    ToolDefinition::new("create_table", "Create a new table in the MySQL server").param(
        ParamSpec::required("query", ParamType::String, "The SQL query to create the table"),
    )
}

pub fn write_query_definition() -> ToolDefinition {
    ToolDefinition::new("write_query", "Execute a write SQL query").param(ParamSpec::required(
        "query",
        ParamType::String,
        QUERY_PARAM_DESCRIPTION,
    ))
}

pub fn update_query_definition() -> ToolDefinition {
    ToolDefinition::new("update_query", "Execute an update SQL query").param(ParamSpec::required(
        "query",
        ParamType::String,
        QUERY_PARAM_DESCRIPTION,
    ))
}

pub fn delete_query_definition() -> ToolDefinition {
    ToolDefinition::new("delete_query", "Execute a delete SQL query").param(ParamSpec::required(
        "query",
        ParamType::String,
        QUERY_PARAM_DESCRIPTION,
    ))
}

/// Output of `create_table`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateTableOutput {
    pub rows_affected: u64,
    pub message: &'static str,
}

/// Output of `update_query` and `delete_query`.
#[derive(Debug, Clone, Serialize)]
pub struct RowsAffectedOutput {
    pub rows_affected: u64,
}

pub struct WriteStatementTool {
    rule: StatementRule,
}

impl WriteStatementTool {
    pub fn new(rule: StatementRule) -> Self {
        Self { rule }
    }

    pub fn create_table() -> Self {
        Self::new(StatementRule::CreateTable)
    }

    pub fn write() -> Self {
        Self::new(StatementRule::AnyWrite)
    }

    pub fn update() -> Self {
        Self::new(StatementRule::Update)
    }

    pub fn delete() -> Self {
        Self::new(StatementRule::Delete)
    }

    /// Shape the executor result for this tool. `operation` is the validated
    /// statement's operation name; an insert id is only meaningful after an
    /// INSERT, anything else would report the connection's previous one.
    fn render(&self, operation: &str, mut result: ExecuteResult) -> DbResult<JsonValue> {
        if operation != "INSERT" {
            result.last_insert_id = None;
        }
        let value = match self.rule {
            StatementRule::CreateTable => serde_json::to_value(CreateTableOutput {
                rows_affected: result.rows_affected,
                message: "Table created",
            })?,
            StatementRule::AnyWrite => serde_json::to_value(result)?,
            _ => serde_json::to_value(RowsAffectedOutput {
                rows_affected: result.rows_affected,
            })?,
        };
        Ok(value)
    }
}

#[async_trait]
impl ToolHandler for WriteStatementTool {
    async fn call(&self, args: &ToolArgs, executor: &dyn Executor) -> DbResult<JsonValue> {
        let sql = args.sql("query")?;
        let statement = validate_statement(sql, executor.backend(), self.rule)?;

        let result = executor.execute(sql).await?;
        info!(
            operation = statement.operation,
            rows_affected = result.rows_affected,
            "Write statement executed"
        );
        self.render(statement.operation, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_shapes() {
        let result = ExecuteResult::new(3).with_last_insert_id(7);

        let v = WriteStatementTool::write().render("INSERT", result).unwrap();
        assert_eq!(v, json!({ "rows_affected": 3, "last_insert_id": 7 }));

        let v = WriteStatementTool::update().render("UPDATE", result).unwrap();
        assert_eq!(v, json!({ "rows_affected": 3 }));

        let v = WriteStatementTool::delete().render("DELETE", result).unwrap();
        assert_eq!(v, json!({ "rows_affected": 3 }));

        let v = WriteStatementTool::create_table()
            .render("CREATE TABLE", ExecuteResult::new(0))
            .unwrap();
        assert_eq!(v, json!({ "rows_affected": 0, "message": "Table created" }));
    }

    #[test]
    fn test_write_without_insert_id() {
        let v = WriteStatementTool::write()
            .render("INSERT", ExecuteResult::new(2))
            .unwrap();
        assert_eq!(v, json!({ "rows_affected": 2 }));
    }

    #[test]
    fn test_write_drops_insert_id_after_non_insert() {
        let stale = ExecuteResult::new(3).with_last_insert_id(3);
        for operation in ["UPDATE", "DELETE", "ALTER TABLE"] {
            let v = WriteStatementTool::write().render(operation, stale).unwrap();
            assert_eq!(v, json!({ "rows_affected": 3 }), "{operation}");
        }
    }
}
