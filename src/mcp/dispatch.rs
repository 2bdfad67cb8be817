//! Tool dispatch pipeline.
//!
//! Every invocation runs the same steps: lifecycle check, registry lookup,
//! argument validation, policy gate (write tools only), handler execution
//! under a deadline, and result formatting. A failure at any step ends the
//! pipeline and becomes an error result; nothing here ever fails the session.

use crate::db::Executor;
use crate::error::{DbError, DbResult};
use crate::policy::PolicyGate;
use crate::tools::{ResultFormatter, ToolArgs, ToolRegistry};
use rmcp::model::{CallToolResult, JsonObject};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

/// Tracks in-flight dispatches so shutdown can refuse new work and wait for
/// running work to finish.
#[derive(Debug, Default)]
pub struct Lifecycle {
    closing: AtomicBool,
    in_flight: RwLock<()>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Register a dispatch. The returned guard must be held until it ends.
    pub async fn enter(&self) -> DbResult<RwLockReadGuard<'_, ()>> {
        if self.is_closing() {
            return Err(DbError::ShuttingDown);
        }
        let guard = self.in_flight.read().await;
        // shutdown may have started while we waited
        if self.is_closing() {
            return Err(DbError::ShuttingDown);
        }
        Ok(guard)
    }

    /// Stop accepting dispatches and wait up to `grace` for running ones.
    /// Returns false if the wait timed out.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.closing.store(true, Ordering::SeqCst);
        tokio::time::timeout(grace, self.in_flight.write()).await.is_ok()
    }
}

/// Shared, immutable dispatch state. One instance serves every session.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    gate: PolicyGate,
    executor: Arc<dyn Executor>,
    timeout: Duration,
    lifecycle: Lifecycle,
}

impl Dispatcher {
    /// Create the dispatcher shared by all sessions.
    ///
    /// # Arguments
    ///
    /// * `registry` - Tool catalog, fixed after startup
    /// * `gate` - Read-only policy applied to write tools
    /// * `executor` - Database seam the handlers run against
    /// * `timeout` - Upper bound on a single handler call
    pub fn new(
        registry: Arc<ToolRegistry>,
        gate: PolicyGate,
        executor: Arc<dyn Executor>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            gate,
            executor,
            timeout,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn gate(&self) -> PolicyGate {
        self.gate
    }

    pub fn is_closing(&self) -> bool {
        self.lifecycle.is_closing()
    }

    /// Run one tool invocation and render its outcome.
    pub async fn dispatch(&self, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        let started = Instant::now();
        let outcome = self.run(name, arguments).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => info!(tool = %name, outcome = "success", elapsed_ms, "Tool call completed"),
            Err(DbError::PolicyDenied { reason }) => {
                warn!(tool = %name, reason = %reason, "Tool call denied by policy")
            }
            Err(e) => info!(
                tool = %name,
                outcome = %e.category(),
                elapsed_ms,
                error = %e,
                "Tool call failed"
            ),
        }

        ResultFormatter::format(outcome)
    }

    async fn run(&self, name: &str, arguments: Option<JsonObject>) -> DbResult<JsonValue> {
        let _guard = self.lifecycle.enter().await?;

        let tool = self
            .registry
            .lookup(name)
            .ok_or_else(|| DbError::unknown_tool(name))?;

        let arguments = arguments.unwrap_or_default();
        tool.definition.validate_args(&arguments)?;

        if tool.class.is_write() {
            self.gate.check(tool.class).into_result()?;
        }

        let args = ToolArgs::new(arguments);
        if let Some(sql) = args.str("query") {
            debug!(tool = %name, sql = %sql, "Dispatching tool");
        }

        match tokio::time::timeout(self.timeout, tool.handler.call(&args, self.executor.as_ref()))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(DbError::timeout(name, self.timeout.as_secs())),
        }
    }

    /// Refuse new dispatches, drain running ones, then close the executor.
    pub async fn shutdown(&self, grace: Duration) {
        if !self.lifecycle.shutdown(grace).await {
            warn!(
                grace_secs = grace.as_secs(),
                "In-flight tool calls did not finish before shutdown deadline"
            );
        }
        info!("Closing database connections");
        self.executor.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lifecycle_refuses_after_shutdown() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.enter().await.is_ok());
        assert!(lifecycle.shutdown(Duration::from_millis(50)).await);
        assert!(matches!(
            lifecycle.enter().await,
            Err(DbError::ShuttingDown)
        ));
    }

    #[tokio::test]
    async fn test_lifecycle_waits_for_in_flight() {
        let lifecycle = Arc::new(Lifecycle::new());
        let guard_holder = lifecycle.clone();
        let done = Arc::new(AtomicBool::new(false));
        let worker_done = done.clone();
        let (entered_tx, entered_rx) = tokio::sync::oneshot::channel();

        let worker = tokio::spawn(async move {
            let _guard = guard_holder.enter().await.unwrap();
            let _ = entered_tx.send(());
            tokio::time::sleep(Duration::from_millis(50)).await;
            worker_done.store(true, Ordering::SeqCst);
        });
        entered_rx.await.unwrap();

        assert!(lifecycle.shutdown(Duration::from_secs(5)).await);
        assert!(done.load(Ordering::SeqCst));
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_lifecycle_shutdown_deadline() {
        let lifecycle = Lifecycle::new();
        let _guard = lifecycle.enter().await.unwrap();
        assert!(!lifecycle.shutdown(Duration::from_millis(20)).await);
        assert!(lifecycle.is_closing());
    }
}
