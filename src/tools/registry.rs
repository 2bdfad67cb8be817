//! Tool registry: name → definition, classification and handler.
//!
//! The registry is built once at startup and never mutated afterwards, so it
//! can be shared between sessions behind an `Arc` without locking.

use crate::db::Executor;
use crate::error::{DbError, DbResult};
use crate::policy::ToolClass;
use async_trait::async_trait;
use rmcp::model::{JsonObject, Tool};
use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    Boolean,
}

impl ParamType {
    fn schema_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    fn matches(&self, value: &JsonValue) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema_name())
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: ParamType,
    pub required: bool,
    pub description: &'static str,
}

impl ParamSpec {
    pub fn required(name: &'static str, ty: ParamType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: true,
            description,
        }
    }

    pub fn optional(name: &'static str, ty: ParamType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: false,
            description,
        }
    }
}

/// Public contract of a tool as advertised to clients.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    /// Parameters in declaration order.
    pub params: Vec<ParamSpec>,
}

impl ToolDefinition {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// JSON Schema object describing the parameters.
    pub fn input_schema(&self) -> JsonObject {
        let mut properties = serde_json::Map::new();
        for p in &self.params {
            properties.insert(
                p.name.to_string(),
                json!({ "type": p.ty.schema_name(), "description": p.description }),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        let mut schema = serde_json::Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), JsonValue::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), json!(required));
        }
        schema
    }

    pub fn to_mcp_tool(&self) -> Tool {
        Tool::new(self.name, self.description, Arc::new(self.input_schema()))
    }

    /// Check required parameters are present and declared parameters have
    /// the right JSON type. Undeclared arguments are ignored.
    pub fn validate_args(&self, args: &JsonObject) -> DbResult<()> {
        for p in &self.params {
            match args.get(p.name) {
                None | Some(JsonValue::Null) => {
                    if p.required {
                        return Err(DbError::missing_parameter(p.name));
                    }
                }
                Some(value) if !p.ty.matches(value) => {
                    return Err(DbError::invalid_input(format!(
                        "invalid parameter '{}': expected {}, got {}",
                        p.name,
                        p.ty,
                        json_type_name(value)
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Arguments of one invocation, already checked against the definition.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs(JsonObject);

impl ToolArgs {
    pub fn new(args: JsonObject) -> Self {
        Self(args)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(JsonValue::as_str)
    }

    pub fn required_str(&self, name: &str) -> DbResult<&str> {
        self.str(name)
            .ok_or_else(|| DbError::missing_parameter(name))
    }

    /// A required SQL argument with surrounding whitespace removed.
    pub fn sql(&self, name: &str) -> DbResult<&str> {
        let sql = self.required_str(name)?.trim();
        if sql.is_empty() {
            return Err(DbError::invalid_input(format!("'{}' must not be empty", name)));
        }
        Ok(sql)
    }
}

/// Body of a tool. Runs after lookup, argument validation and the policy gate.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: &ToolArgs, executor: &dyn Executor) -> DbResult<JsonValue>;
}

#[derive(Clone)]
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    pub class: ToolClass,
    pub handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("name", &self.definition.name)
            .field("class", &self.class)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A duplicate name is a configuration error.
    pub fn register(
        &mut self,
        definition: ToolDefinition,
        class: ToolClass,
        handler: Arc<dyn ToolHandler>,
    ) -> DbResult<()> {
        if self.index.contains_key(definition.name) {
            return Err(DbError::configuration(format!(
                "tool '{}' is registered twice",
                definition.name
            )));
        }
        self.index.insert(definition.name, self.tools.len());
        self.tools.push(RegisteredTool {
            definition,
            class,
            handler,
        });
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Tools in registration order.
    pub fn tools(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.tools.iter()
    }

    pub fn mcp_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.definition.to_mcp_tool()).collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.definition.name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl ToolHandler for Noop {
        async fn call(&self, _args: &ToolArgs, _executor: &dyn Executor) -> DbResult<JsonValue> {
            Ok(JsonValue::Null)
        }
    }

    fn query_tool(name: &'static str) -> ToolDefinition {
        ToolDefinition::new(name, "Execute a query").param(ParamSpec::required(
            "query",
            ParamType::String,
            "The SQL query to execute",
        ))
    }

    fn args(value: JsonValue) -> JsonObject {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ToolRegistry::new();
        registry
            .register(query_tool("read_query"), ToolClass::Read, Arc::new(Noop))
            .unwrap();
        let err = registry
            .register(query_tool("read_query"), ToolClass::Read, Arc::new(Noop))
            .unwrap_err();
        assert!(matches!(err, DbError::Configuration { .. }));
        assert!(err.is_fatal());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_and_order() {
        let mut registry = ToolRegistry::new();
        for name in ["b_tool", "a_tool", "c_tool"] {
            registry
                .register(ToolDefinition::new(name, "x"), ToolClass::Read, Arc::new(Noop))
                .unwrap();
        }
        assert_eq!(registry.names(), vec!["b_tool", "a_tool", "c_tool"]);
        assert!(registry.lookup("a_tool").is_some());
        assert!(registry.lookup("drop_everything").is_none());
    }

    #[test]
    fn test_input_schema() {
        let def = ToolDefinition::new("list_table", "List tables").param(ParamSpec::optional(
            "name",
            ParamType::String,
            "Filter",
        ));
        let schema = JsonValue::Object(def.input_schema());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["name"]["type"], "string");
        assert!(schema.get("required").is_none());

        let schema = JsonValue::Object(query_tool("read_query").input_schema());
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[test]
    fn test_validate_missing_and_null() {
        let def = query_tool("create_table");
        let err = def.validate_args(&args(json!({}))).unwrap_err();
        assert_eq!(err.to_string(), "missing required parameter: query");

        let err = def.validate_args(&args(json!({ "query": null }))).unwrap_err();
        assert!(matches!(err, DbError::MissingParameter { .. }));
    }

    #[test]
    fn test_validate_type_mismatch() {
        let def = query_tool("read_query");
        let err = def.validate_args(&args(json!({ "query": 42 }))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: invalid parameter 'query': expected string, got number"
        );
    }

    #[test]
    fn test_validate_ignores_extra_args() {
        let def = query_tool("read_query");
        assert!(
            def.validate_args(&args(json!({ "query": "SELECT 1", "limit": 5 })))
                .is_ok()
        );
    }

    #[test]
    fn test_tool_args_sql() {
        let a = ToolArgs::new(args(json!({ "query": "  SELECT 1  ", "blank": "   " })));
        assert_eq!(a.sql("query").unwrap(), "SELECT 1");
        assert!(matches!(a.sql("blank"), Err(DbError::InvalidInput { .. })));
        assert!(matches!(a.sql("missing"), Err(DbError::MissingParameter { .. })));
        assert_eq!(a.str("blank"), Some("   "));
    }
}
