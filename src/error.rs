//! Error types for the MySQL MCP server.
//!
//! A single `thiserror` enum covers every failure the server can observe.
//! Only configuration and transport errors stop the process or a session;
//! everything else is rendered as a failed tool result so the calling agent
//! can react to it.

use crate::config::DEFAULT_ACQUIRE_TIMEOUT_SECS;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("missing required parameter: {name}")]
    MissingParameter { name: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Reason produced by the policy gate, e.g.
    /// "Write queries are disabled in read-only mode".
    #[error("{reason}")]
    PolicyDenied { reason: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42S02" for unknown table
        sql_state: Option<String>,
    },

    #[error("Schema error: {message}")]
    Schema { message: String, object: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Server is shutting down")]
    ShuttingDown,

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Coarse failure class, used by agents to decide how to react and by the
/// session loop to decide whether to keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Startup only; the process must not serve.
    Configuration,
    /// Unknown tool or bad arguments. Retry with different input.
    Request,
    /// Capability disabled by the read-only policy.
    Policy,
    /// The database rejected or failed the statement.
    Execution,
    /// The channel itself failed; ends the session.
    Transport,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Request => write!(f, "request"),
            Self::Policy => write!(f, "policy"),
            Self::Execution => write!(f, "execution"),
            Self::Transport => write!(f, "transport"),
        }
    }
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unknown tool error.
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    /// Create a missing parameter error.
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a read-only policy denial from the capitalised action phrase.
    pub fn policy_denied(action: &str) -> Self {
        // "Table creation is", "Write queries are"
        let verb = if action.ends_with('s') { "are" } else { "is" };
        Self::PolicyDenied {
            reason: format!("{} {} disabled in read-only mode", action, verb),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::UnknownTool { .. } | Self::MissingParameter { .. } | Self::InvalidInput { .. } => {
                ErrorCategory::Request
            }
            Self::PolicyDenied { .. } => ErrorCategory::Policy,
            Self::Transport { .. } => ErrorCategory::Transport,
            Self::Connection { .. }
            | Self::Database { .. }
            | Self::Schema { .. }
            | Self::Timeout { .. }
            | Self::ShuttingDown
            | Self::Internal { .. } => ErrorCategory::Execution,
        }
    }

    /// True for errors that must stop the process or the session loop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Configuration | ErrorCategory::Transport
        )
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Message shown to the agent. Database errors carry their SQL state.
    pub fn user_message(&self) -> String {
        match self {
            Self::Database {
                message,
                sql_state: Some(code),
            } => format!("Database error: {} (SQLSTATE: {})", message, code),
            Self::Connection {
                message,
                suggestion,
            } => format!("Connection failed: {}. {}", message, suggestion),
            _ => self.to_string(),
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => DbError::database("No rows returned", None),
            // pools are built with the default acquire timeout
            sqlx::Error::PoolTimedOut => {
                DbError::timeout("connection pool acquire", DEFAULT_ACQUIRE_TIMEOUT_SECS)
            }
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Restart the server")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => DbError::schema(
                format!("Type not found: {}", type_name),
                type_name.to_string(),
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::schema(format!("Column not found: {}", col), col.to_string())
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::internal(format!("Failed to serialize result: {}", err))
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
