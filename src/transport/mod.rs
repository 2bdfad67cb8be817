//! Transport layer for the MCP server.
//!
//! - Stdio: standard input/output, one session (the default)
//! - HTTP: streamable HTTP, one session per client

pub mod http;
pub mod stdio;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

use crate::error::DbResult;
use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

/// How long shutdown waits for in-flight tool calls.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Trait for MCP transport implementations.
pub trait Transport: Send + Sync {
    /// Serve until the transport closes or a shutdown signal arrives.
    fn run(&self) -> impl Future<Output = DbResult<()>> + Send;
}

/// Wait for SIGINT or SIGTERM. A handler that cannot be installed never fires.
pub(crate) async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
