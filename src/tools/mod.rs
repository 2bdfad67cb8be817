//! MCP tool implementations.
//!
//! - `registry`: tool definitions, parameter schemas and the name → handler map
//! - `schema`: `list_database`, `list_table`, `desc_table`
//! - `query`: `read_query`
//! - `write`: `create_table`, `write_query`, `update_query`, `delete_query`
//! - `sql_validator`: statement-kind checks shared by the query tools
//! - `format`: rendering of outcomes into MCP results

pub mod format;
pub mod query;
pub mod registry;
pub mod schema;
pub mod sql_validator;
pub mod write;

pub use format::ResultFormatter;
pub use registry::{ParamSpec, ParamType, ToolArgs, ToolDefinition, ToolHandler, ToolRegistry};

use crate::error::DbResult;
use crate::policy::ToolClass;
use std::sync::Arc;

/// Build the registry holding the full tool catalog.
pub fn default_registry() -> DbResult<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    registry.register(
        schema::list_database_definition(),
        ToolClass::Read,
        Arc::new(schema::ListDatabasesTool),
    )?;
    registry.register(
        schema::list_table_definition(),
        ToolClass::Read,
        Arc::new(schema::ListTablesTool),
    )?;
    registry.register(
        write::create_table_definition(),
        ToolClass::Write {
            action: "Table creation",
        },
        Arc::new(write::WriteStatementTool::create_table()),
    )?;
    registry.register(
        schema::desc_table_definition(),
        ToolClass::Read,
        Arc::new(schema::DescribeTableTool),
    )?;
    registry.register(
        query::read_query_definition(),
        ToolClass::Read,
        Arc::new(query::ReadQueryTool),
    )?;
    registry.register(
        write::write_query_definition(),
        ToolClass::Write {
            action: "Write queries",
        },
        Arc::new(write::WriteStatementTool::write()),
    )?;
    registry.register(
        write::update_query_definition(),
        ToolClass::Write {
            action: "Update queries",
        },
        Arc::new(write::WriteStatementTool::update()),
    )?;
    registry.register(
        write::delete_query_definition(),
        ToolClass::Write {
            action: "Delete queries",
        },
        Arc::new(write::WriteStatementTool::delete()),
    )?;

    Ok(registry)
}
