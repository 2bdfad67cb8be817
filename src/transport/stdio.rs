//! Stdio transport for the MCP server.
//!
//! JSON-RPC messages are read from stdin and written to stdout; logs go to
//! stderr so they never corrupt the protocol stream.

use crate::error::{DbError, DbResult};
use crate::mcp::{DbService, Dispatcher};
use crate::transport::{SHUTDOWN_GRACE, Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Stdio transport implementation. Serves exactly one session.
pub struct StdioTransport {
    dispatcher: Arc<Dispatcher>,
}

impl StdioTransport {
    /// Create a new stdio transport.
    ///
    /// # Arguments
    ///
    /// * `dispatcher` - Dispatch state for the single stdio session
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> DbResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = DbService::new(self.dispatcher.clone());
        let running_service = service
            .serve(stdio())
            .await
            .map_err(|e| DbError::transport(format!("Failed to start stdio transport: {}", e)))?;

        let outcome = tokio::select! {
            result = running_service.waiting() => match result {
                Ok(reason) => {
                    info!(reason = ?reason, "Stdio session closed");
                    Ok(false)
                }
                Err(e) => {
                    warn!(error = %e, "Stdio transport error");
                    Err(DbError::transport(format!("Stdio transport error: {}", e)))
                }
            },
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                Ok(true)
            }
        };

        let signalled = matches!(outcome, Ok(true));
        if signalled {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        self.dispatcher.shutdown(SHUTDOWN_GRACE).await;

        if signalled {
            // a pending stdin read cannot be interrupted, so leave directly
            info!("Exiting process");
            std::process::exit(0);
        }

        outcome.map(|_| ())
    }
}
