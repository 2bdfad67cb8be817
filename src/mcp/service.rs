//! MCP service implementation using rmcp.
//!
//! `DbService` is the per-session handler. It advertises the tool catalog
//! from the registry and forwards every `tools/call` to the shared
//! [`Dispatcher`]. Calls within one session are serialized; separate
//! sessions run independently.

use crate::mcp::dispatch::Dispatcher;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub const SERVER_NAME: &str = "mcp-mysql";

#[derive(Clone)]
pub struct DbService {
    dispatcher: Arc<Dispatcher>,
    /// Held for the duration of each call so a session handles one request
    /// at a time.
    session: Arc<Mutex<()>>,
}

impl DbService {
    /// Create a handler for a new session.
    ///
    /// # Arguments
    ///
    /// * `dispatcher` - Dispatch state shared with every other session
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            session: Arc::new(Mutex::new(())),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Dispatch one call, waiting for any earlier call of this session.
    pub async fn handle_call(&self, request: CallToolRequestParam) -> CallToolResult {
        let _turn = self.session.lock().await;
        debug!(tool = %request.name, "Handling tool call");
        self.dispatcher
            .dispatch(&request.name, request.arguments)
            .await
    }

    fn instructions(&self) -> String {
        let mode = if self.dispatcher.gate().is_read_only() {
            "The server is in READ-ONLY mode: create_table, write_query, update_query and \
             delete_query are disabled and return an error."
        } else {
            "The server is writable: all tools are enabled."
        };
        format!(
            "MySQL database tools.\n\
             \n\
             ## Tools\n\
             - `list_database`: list databases on the server\n\
             - `list_table`: list tables, optionally filtered by a name substring\n\
             - `desc_table`: describe the columns of a table\n\
             - `read_query`: run one read-only statement (SELECT, SHOW, DESCRIBE, EXPLAIN)\n\
             - `create_table`: run one CREATE TABLE statement\n\
             - `write_query`: run one mutating statement (INSERT, DDL, ...)\n\
             - `update_query`: run one UPDATE statement\n\
             - `delete_query`: run one DELETE statement\n\
             \n\
             Each call runs exactly one statement.\n\
             \n\
             {}",
            mode
        )
    }
}

impl ServerHandler for DbService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_owned(),
                title: Some("MySQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(self.instructions()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(
            self.dispatcher.registry().mcp_tools(),
        ))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.handle_call(request).await)
    }
}
