//! Rendering of tool outcomes into MCP call results.
//!
//! Successful payloads are sent as pretty-printed JSON text, failures as a
//! single text message with `isError` set. Formatting never fails: every
//! outcome produces a well-formed result.

use crate::error::{DbError, DbResult};
use rmcp::model::{CallToolResult, Content};
use serde_json::Value as JsonValue;

pub struct ResultFormatter;

impl ResultFormatter {
    pub fn format(outcome: DbResult<JsonValue>) -> CallToolResult {
        match outcome {
            Ok(payload) => Self::success(&payload),
            Err(err) => Self::failure(&err),
        }
    }

    pub fn success(payload: &JsonValue) -> CallToolResult {
        let text = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
        CallToolResult::success(vec![Content::text(text)])
    }

    pub fn failure(err: &DbError) -> CallToolResult {
        CallToolResult::error(vec![Content::text(err.user_message())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// (text, is_error) of a result, read through its wire form.
    fn wire(result: &CallToolResult) -> (String, bool) {
        let value = serde_json::to_value(result).unwrap();
        let text = value["content"][0]["text"].as_str().unwrap().to_string();
        let is_error = value["isError"].as_bool().unwrap_or(false);
        (text, is_error)
    }

    #[test]
    fn test_success_preserves_column_order() {
        let rows = json!([{ "zeta": 1, "alpha": "a", "mid": null }]);
        let (text, is_error) = wire(&ResultFormatter::success(&rows));
        assert!(!is_error);
        let z = text.find("zeta").unwrap();
        let a = text.find("alpha").unwrap();
        let m = text.find("mid").unwrap();
        assert!(z < a && a < m, "{text}");

        let parsed: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, rows);
    }

    #[test]
    fn test_failure_is_text_with_error_flag() {
        let err = DbError::policy_denied("Write queries");
        let (text, is_error) = wire(&ResultFormatter::failure(&err));
        assert!(is_error);
        assert_eq!(text, "Write queries are disabled in read-only mode");
    }

    #[test]
    fn test_format_dispatches_on_outcome() {
        let (_, is_error) = wire(&ResultFormatter::format(Ok(json!(["users"]))));
        assert!(!is_error);

        let (text, is_error) =
            wire(&ResultFormatter::format(Err(DbError::unknown_tool("drop_everything"))));
        assert!(is_error);
        assert_eq!(text, "unknown tool: drop_everything");
    }

    #[test]
    fn test_database_error_carries_sql_state() {
        let err = DbError::database("Table 'shop.nope' doesn't exist", Some("42S02".into()));
        let (text, _) = wire(&ResultFormatter::failure(&err));
        assert!(text.contains("doesn't exist"));
        assert!(text.contains("42S02"));
    }
}
