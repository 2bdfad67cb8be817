//! Query execution.
//!
//! [`Executor`] is the seam between the tool handlers and the database. The
//! production implementation, [`SqlExecutor`], runs statements through a
//! database-specific sqlx pool. Row limits are enforced while streaming, so
//! only `max_rows + 1` rows are ever fetched.
//!
//! Database-specific code lives in the `mysql`, `postgres` and `sqlite`
//! submodules, which are kept structurally parallel.

use crate::db::pool::DbPool;
use crate::db::schema::SchemaInspector;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{ColumnInfo, DEFAULT_MAX_ROWS, DatabaseType, ExecuteResult, QueryResult};
use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::{debug, warn};

/// Database operations the tool handlers depend on.
///
/// Implementations must be safe to share across sessions; each call is an
/// independent unit of work with no state carried between calls.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a row-returning statement.
    async fn query(&self, sql: &str) -> DbResult<QueryResult>;

    /// Run a mutating statement.
    async fn execute(&self, sql: &str) -> DbResult<ExecuteResult>;

    async fn describe_table(&self, table_name: &str) -> DbResult<Vec<ColumnInfo>>;

    async fn list_databases(&self) -> DbResult<Vec<String>>;

    /// Table names of the current database, optionally filtered by a
    /// case-sensitive substring.
    async fn list_tables(&self, filter: Option<&str>) -> DbResult<Vec<String>>;

    /// Backend type, used to pick the SQL dialect.
    fn backend(&self) -> DatabaseType;

    /// Release pooled connections. Further calls fail.
    async fn close(&self);
}

/// Keep names containing `filter`; no filter keeps everything.
pub fn filter_names(names: Vec<String>, filter: Option<&str>) -> Vec<String> {
    match filter {
        Some(f) if !f.is_empty() => names.into_iter().filter(|n| n.contains(f)).collect(),
        _ => names,
    }
}

/// [`Executor`] backed by a sqlx connection pool.
#[derive(Debug, Clone)]
pub struct SqlExecutor {
    pool: DbPool,
    max_rows: usize,
}

impl SqlExecutor {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    /// Cap on rows returned by [`Executor::query`]. Clamped to at least 1.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.max(1);
        self
    }
}

#[async_trait]
impl Executor for SqlExecutor {
    async fn query(&self, sql: &str) -> DbResult<QueryResult> {
        debug!(sql = %sql, limit = self.max_rows, "Executing query");

        match &self.pool {
            DbPool::MySql(p) => {
                let rows = mysql::fetch_rows(p, sql, self.max_rows).await?;
                Ok(process_rows(rows, self.max_rows))
            }
            DbPool::Postgres(p) => {
                let rows = postgres::fetch_rows(p, sql, self.max_rows).await?;
                Ok(process_rows(rows, self.max_rows))
            }
            DbPool::SQLite(p) => {
                let rows = sqlite::fetch_rows(p, sql, self.max_rows).await?;
                Ok(process_rows(rows, self.max_rows))
            }
        }
    }

    async fn execute(&self, sql: &str) -> DbResult<ExecuteResult> {
        debug!(sql = %sql, "Executing write operation");

        match &self.pool {
            DbPool::MySql(p) => mysql::execute_write(p, sql).await,
            DbPool::Postgres(p) => postgres::execute_write(p, sql).await,
            DbPool::SQLite(p) => sqlite::execute_write(p, sql).await,
        }
    }

    async fn describe_table(&self, table_name: &str) -> DbResult<Vec<ColumnInfo>> {
        SchemaInspector::describe_table(&self.pool, table_name).await
    }

    async fn list_databases(&self) -> DbResult<Vec<String>> {
        SchemaInspector::list_databases(&self.pool).await
    }

    async fn list_tables(&self, filter: Option<&str>) -> DbResult<Vec<String>> {
        let names = SchemaInspector::list_tables(&self.pool).await?;
        Ok(filter_names(names, filter))
    }

    fn backend(&self) -> DatabaseType {
        self.pool.db_type()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Turn fetched rows into a [`QueryResult`], dropping the sentinel row used
/// to detect truncation.
fn process_rows<R: RowToJson>(rows: Vec<R>, row_limit: usize) -> QueryResult {
    let Some(first) = rows.first() else {
        return QueryResult::default();
    };

    let columns = first.column_names();
    let total_rows = rows.len();
    let truncated = total_rows > row_limit;

    let json_rows = rows
        .iter()
        .take(row_limit)
        .map(|r| r.to_json_map())
        .collect();

    if truncated {
        warn!(limit = row_limit, "Query result truncated");
    }

    QueryResult::new(columns, json_rows, truncated)
}

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> DbResult<Vec<R>> {
    results
        .into_iter()
        .map(|r| r.map_err(DbError::from))
        .collect()
}

// Reads go through `sqlx::query`, which prepares the statement; a prepared
// statement holds exactly one statement, so nothing can ride along after the
// validated one. Writes send raw SQL over the text protocol, which also
// accepts statements that cannot be prepared (e.g. CREATE PROCEDURE).

mod mysql {
    use super::*;
    use sqlx::MySqlPool;
    use sqlx::mysql::{MySqlDatabaseError, MySqlRow};

    /// ER_UNSUPPORTED_PS: "This command is not supported in the prepared
    /// statement protocol yet".
    const ER_UNSUPPORTED_PS: u16 = 1295;

    pub async fn fetch_rows(pool: &MySqlPool, sql: &str, row_limit: usize) -> DbResult<Vec<MySqlRow>> {
        let results = sqlx::query(sql)
            .fetch(pool)
            .take(row_limit + 1)
            .collect::<Vec<_>>()
            .await;

        // Some SHOW forms cannot be prepared; they are retried as text once the
        // caller has validated them as a single read statement.
        if results.iter().any(|r| matches!(r, Err(e) if is_unsupported_prepare(e))) {
            debug!("Statement cannot be prepared, retrying over the text protocol");
            use sqlx::Executor;
            let results = pool.fetch(sql).take(row_limit + 1).collect::<Vec<_>>().await;
            return collect_rows(results);
        }
        collect_rows(results)
    }

    fn is_unsupported_prepare(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => db_err
                .try_downcast_ref::<MySqlDatabaseError>()
                .is_some_and(|e| e.number() == ER_UNSUPPORTED_PS),
            _ => false,
        }
    }

    pub async fn execute_write(pool: &MySqlPool, sql: &str) -> DbResult<ExecuteResult> {
        use sqlx::Executor;
        let result = pool.execute(sql).await?;
        Ok(ExecuteResult::new(result.rows_affected()).with_last_insert_id(result.last_insert_id()))
    }
}

mod postgres {
    use super::*;
    use sqlx::PgPool;
    use sqlx::postgres::PgRow;

    pub async fn fetch_rows(pool: &PgPool, sql: &str, row_limit: usize) -> DbResult<Vec<PgRow>> {
        let results = sqlx::query(sql)
            .fetch(pool)
            .take(row_limit + 1)
            .collect::<Vec<_>>()
            .await;
        collect_rows(results)
    }

    pub async fn execute_write(pool: &PgPool, sql: &str) -> DbResult<ExecuteResult> {
        use sqlx::Executor;
        let result = pool.execute(sql).await?;
        Ok(ExecuteResult::new(result.rows_affected()))
    }
}

mod sqlite {
    use super::*;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqliteRow;

    pub async fn fetch_rows(pool: &SqlitePool, sql: &str, row_limit: usize) -> DbResult<Vec<SqliteRow>> {
        let results = sqlx::query(sql)
            .fetch(pool)
            .take(row_limit + 1)
            .collect::<Vec<_>>()
            .await;
        collect_rows(results)
    }

    pub async fn execute_write(pool: &SqlitePool, sql: &str) -> DbResult<ExecuteResult> {
        use sqlx::Executor;
        let result = pool.execute(sql).await?;
        let rows_affected = result.rows_affected();
        // last_insert_rowid is connection state; callers keep it for INSERT only
        let last_id = u64::try_from(result.last_insert_rowid()).unwrap_or(0);
        Ok(ExecuteResult::new(rows_affected).with_last_insert_id(last_id))
    }
}
