//! MySQL MCP Server - Main entry point.

use mcp_mysql::config::{Config, TransportMode};
use mcp_mysql::db::{DbPool, PoolSettings, SqlExecutor};
use mcp_mysql::error::DbResult;
use mcp_mysql::mcp::Dispatcher;
use mcp_mysql::policy::PolicyGate;
use mcp_mysql::tools::default_registry;
use mcp_mysql::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber. Logs go to stderr; stdout carries the
/// protocol in stdio mode.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Validate configuration, connect and assemble the shared dispatcher.
async fn build_dispatcher(config: &Config) -> DbResult<Arc<Dispatcher>> {
    config.validate()?;
    let registry = Arc::new(default_registry()?);

    let connection_string = config.connection_string()?;
    info!(
        database = %config.masked_connection_string(),
        read_only = config.read_only,
        "Connecting to database"
    );

    let settings = PoolSettings {
        max_connections: config.max_connections,
        read_only: config.read_only,
        ..PoolSettings::default()
    };
    let pool = DbPool::connect(&connection_string, &settings).await?;
    let executor = SqlExecutor::new(pool).with_max_rows(config.max_rows);

    Ok(Arc::new(Dispatcher::new(
        registry,
        PolicyGate::new(config.read_only),
        Arc::new(executor),
        config.query_timeout_duration(),
    )))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();

    init_tracing(&config);

    info!(
        transport = %config.transport,
        "Starting MySQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let dispatcher = match build_dispatcher(&config).await {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!(error = %e.user_message(), category = %e.category(), "Startup failed");
            return Err(e.into());
        }
    };

    let result = match config.transport {
        TransportMode::Stdio => StdioTransport::new(dispatcher).run().await,
        TransportMode::Http => {
            info!(
                addr = %config.http_bind_addr(),
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            HttpTransport::new(
                dispatcher,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
