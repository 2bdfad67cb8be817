//! SQL statement-kind validation.
//!
//! Each query tool accepts a specific kind of statement: `read_query` only
//! read-only statements, `create_table` only CREATE TABLE, and so on. The
//! statement is parsed with [sqlparser](https://docs.rs/sqlparser/) using the
//! dialect of the connected backend, so formatting tricks cannot disguise a
//! write as a read. Exactly one statement is accepted per call.

use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;
use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

/// Type of SQL statement detected by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlStatementType {
    /// SELECT and other read-only queries (SELECT, SHOW, DESCRIBE, EXPLAIN)
    Select,
    /// INSERT, UPDATE, DELETE, MERGE, COPY
    DmlWrite,
    /// CREATE, DROP, ALTER, TRUNCATE
    Ddl,
    /// BEGIN, COMMIT, ROLLBACK, SAVEPOINT
    Transaction,
    /// CALL, EXECUTE, PREPARE
    ProcedureCall,
    /// GRANT, REVOKE, SET, USE, LOCK, PRAGMA and friends
    Administrative,
    Unknown,
}

/// Which statements a tool accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementRule {
    /// Read-only statements only.
    ReadOnly,
    CreateTable,
    Update,
    Delete,
    /// Anything that is not read-only.
    AnyWrite,
}

impl StatementRule {
    fn tool_name(&self) -> &'static str {
        match self {
            Self::ReadOnly => "read_query",
            Self::CreateTable => "create_table",
            Self::Update => "update_query",
            Self::Delete => "delete_query",
            Self::AnyWrite => "write_query",
        }
    }
}

/// A classified statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub kind: SqlStatementType,
    /// Upper-case operation name, e.g. "CREATE TABLE".
    pub operation: &'static str,
}

/// Get the appropriate SQL dialect for the given database type.
fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::PostgreSQL => Box::new(PostgreSqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// MySQL runs the body of `/*! ... */` comments and reads `/*+ ... */` as
/// optimizer hints; the parser treats both as plain comments.
const MYSQL_EXECUTABLE_COMMENTS: [&str; 2] = ["/*!", "/*+"];

/// Parse `sql` and classify its single statement.
pub fn classify_sql(sql: &str, db_type: DatabaseType) -> DbResult<Classified> {
    if db_type == DatabaseType::MySQL
        && MYSQL_EXECUTABLE_COMMENTS.iter().any(|marker| sql.contains(marker))
    {
        return Err(DbError::invalid_input(
            "MySQL executable comments (/*! ... */) and optimizer hints (/*+ ... */) are not allowed",
        ));
    }

    let dialect = get_dialect(db_type);

    let statements = Parser::parse_sql(dialect.as_ref(), sql)
        .map_err(|e| DbError::invalid_input(format!("Invalid SQL: {}", e)))?;

    match statements.as_slice() {
        [] => Err(DbError::invalid_input("Empty SQL statement")),
        [stmt] => {
            let (kind, operation) = classify_statement(stmt);
            Ok(Classified { kind, operation })
        }
        _ => Err(DbError::invalid_input(format!(
            "Multiple statements are not allowed; send one statement per call ({} found)",
            statements.len()
        ))),
    }
}

/// Check that `sql` is a single statement of the kind `rule` accepts.
///
/// # Arguments
///
/// * `sql` - The SQL text sent by the client
/// * `db_type` - Backend of the connected pool (selects the parser dialect)
/// * `rule` - Statement kinds the calling tool accepts
///
/// Returns the classified statement, or an invalid-input error naming the
/// tool that would accept it.
pub fn validate_statement(sql: &str, db_type: DatabaseType, rule: StatementRule) -> DbResult<Classified> {
    let classified = classify_sql(sql, db_type)?;
    let op = classified.operation;

    let allowed = match rule {
        StatementRule::ReadOnly => classified.kind == SqlStatementType::Select,
        StatementRule::CreateTable => op == "CREATE TABLE",
        StatementRule::Update => op == "UPDATE",
        StatementRule::Delete => op == "DELETE",
        StatementRule::AnyWrite => classified.kind != SqlStatementType::Select,
    };
    if allowed {
        return Ok(classified);
    }

    Err(DbError::invalid_input(format!(
        "{} statements are not accepted by {}. {}",
        op,
        rule.tool_name(),
        suggest_tool(&classified)
    )))
}

/// Point the caller at the tool that accepts this statement.
fn suggest_tool(classified: &Classified) -> &'static str {
    match (classified.kind, classified.operation) {
        (SqlStatementType::Select, _) => "Use read_query for read-only statements.",
        (_, "CREATE TABLE") => "Use create_table for CREATE TABLE.",
        (_, "UPDATE") => "Use update_query for UPDATE.",
        (_, "DELETE") => "Use delete_query for DELETE.",
        _ => "Use write_query for this statement.",
    }
}

/// Classify a parsed statement into a statement type.
fn classify_statement(stmt: &Statement) -> (SqlStatementType, &'static str) {
    match stmt {
        Statement::Query(_) => (SqlStatementType::Select, "SELECT"),
        Statement::ShowTables { .. } => (SqlStatementType::Select, "SHOW TABLES"),
        Statement::ShowColumns { .. } => (SqlStatementType::Select, "SHOW COLUMNS"),
        Statement::ShowDatabases { .. } => (SqlStatementType::Select, "SHOW DATABASES"),
        Statement::ShowSchemas { .. } => (SqlStatementType::Select, "SHOW SCHEMAS"),
        Statement::ShowCreate { .. } => (SqlStatementType::Select, "SHOW CREATE"),
        Statement::ShowFunctions { .. } => (SqlStatementType::Select, "SHOW FUNCTIONS"),
        Statement::ShowVariable { .. } => (SqlStatementType::Select, "SHOW VARIABLE"),
        Statement::ShowVariables { .. } => (SqlStatementType::Select, "SHOW VARIABLES"),
        Statement::ShowStatus { .. } => (SqlStatementType::Select, "SHOW STATUS"),
        Statement::ShowCollation { .. } => (SqlStatementType::Select, "SHOW COLLATION"),
        Statement::ExplainTable { .. } => (SqlStatementType::Select, "DESCRIBE"),

        // EXPLAIN is only as read-only as the statement it explains
        Statement::Explain { statement, .. } => {
            let (inner_type, inner_name) = classify_statement(statement);
            if inner_type == SqlStatementType::Select {
                (SqlStatementType::Select, "EXPLAIN")
            } else {
                (inner_type, inner_name)
            }
        }

        Statement::Insert(_) => (SqlStatementType::DmlWrite, "INSERT"),
        Statement::Update { .. } => (SqlStatementType::DmlWrite, "UPDATE"),
        Statement::Delete(_) => (SqlStatementType::DmlWrite, "DELETE"),
        Statement::Merge { .. } => (SqlStatementType::DmlWrite, "MERGE"),
        Statement::Copy { .. } => (SqlStatementType::DmlWrite, "COPY"),

        Statement::CreateTable { .. } => (SqlStatementType::Ddl, "CREATE TABLE"),
        Statement::CreateView { .. } => (SqlStatementType::Ddl, "CREATE VIEW"),
        Statement::CreateIndex(_) => (SqlStatementType::Ddl, "CREATE INDEX"),
        Statement::CreateSchema { .. } => (SqlStatementType::Ddl, "CREATE SCHEMA"),
        Statement::CreateDatabase { .. } => (SqlStatementType::Ddl, "CREATE DATABASE"),
        Statement::CreateFunction { .. } => (SqlStatementType::Ddl, "CREATE FUNCTION"),
        Statement::CreateProcedure { .. } => (SqlStatementType::Ddl, "CREATE PROCEDURE"),
        Statement::CreateTrigger { .. } => (SqlStatementType::Ddl, "CREATE TRIGGER"),
        Statement::CreateVirtualTable { .. } => (SqlStatementType::Ddl, "CREATE VIRTUAL TABLE"),
        Statement::AlterTable { .. } => (SqlStatementType::Ddl, "ALTER TABLE"),
        Statement::AlterView { .. } => (SqlStatementType::Ddl, "ALTER VIEW"),
        Statement::AlterIndex { .. } => (SqlStatementType::Ddl, "ALTER INDEX"),
        Statement::Drop { .. } => (SqlStatementType::Ddl, "DROP"),
        Statement::DropFunction { .. } => (SqlStatementType::Ddl, "DROP FUNCTION"),
        Statement::DropProcedure { .. } => (SqlStatementType::Ddl, "DROP PROCEDURE"),
        Statement::DropTrigger { .. } => (SqlStatementType::Ddl, "DROP TRIGGER"),
        Statement::Truncate { .. } => (SqlStatementType::Ddl, "TRUNCATE"),
        Statement::Comment { .. } => (SqlStatementType::Ddl, "COMMENT"),

        Statement::StartTransaction { .. } => (SqlStatementType::Transaction, "BEGIN"),
        Statement::Commit { .. } => (SqlStatementType::Transaction, "COMMIT"),
        Statement::Rollback { .. } => (SqlStatementType::Transaction, "ROLLBACK"),
        Statement::Savepoint { .. } => (SqlStatementType::Transaction, "SAVEPOINT"),
        Statement::ReleaseSavepoint { .. } => (SqlStatementType::Transaction, "RELEASE SAVEPOINT"),

        Statement::Call { .. } => (SqlStatementType::ProcedureCall, "CALL"),
        Statement::Execute { .. } => (SqlStatementType::ProcedureCall, "EXECUTE"),
        Statement::Prepare { .. } => (SqlStatementType::ProcedureCall, "PREPARE"),

        Statement::Grant { .. } => (SqlStatementType::Administrative, "GRANT"),
        Statement::Revoke { .. } => (SqlStatementType::Administrative, "REVOKE"),
        Statement::Set(_) => (SqlStatementType::Administrative, "SET"),
        Statement::Use(_) => (SqlStatementType::Administrative, "USE"),
        Statement::Kill { .. } => (SqlStatementType::Administrative, "KILL"),
        Statement::Vacuum { .. } => (SqlStatementType::Administrative, "VACUUM"),
        Statement::Analyze { .. } => (SqlStatementType::Administrative, "ANALYZE"),
        Statement::LockTables { .. } => (SqlStatementType::Administrative, "LOCK"),
        Statement::UnlockTables => (SqlStatementType::Administrative, "UNLOCK"),
        Statement::Flush { .. } => (SqlStatementType::Administrative, "FLUSH"),
        Statement::Pragma { .. } => (SqlStatementType::Administrative, "PRAGMA"),
        Statement::OptimizeTable { .. } => (SqlStatementType::Administrative, "OPTIMIZE"),
        Statement::AttachDatabase { .. } => (SqlStatementType::Administrative, "ATTACH"),

        _ => (SqlStatementType::Unknown, "Unrecognized"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MYSQL: DatabaseType = DatabaseType::MySQL;

    fn check(sql: &str, rule: StatementRule) -> DbResult<Classified> {
        validate_statement(sql, MYSQL, rule)
    }

    #[test]
    fn test_read_only_accepts_reads() {
        for sql in [
            "SELECT * FROM users",
            "SELECT a FROM t1 UNION ALL SELECT b FROM t2",
            "SHOW TABLES",
            "SHOW DATABASES",
            "DESCRIBE users",
            "EXPLAIN SELECT * FROM users",
            "WITH recent AS (SELECT * FROM orders) SELECT COUNT(*) FROM recent",
        ] {
            assert!(check(sql, StatementRule::ReadOnly).is_ok(), "{sql}");
        }
    }

    #[test]
    fn test_read_only_rejects_writes_with_hint() {
        let err = check("INSERT INTO users VALUES (1)", StatementRule::ReadOnly).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
        let msg = err.to_string();
        assert!(msg.contains("INSERT"), "{msg}");
        assert!(msg.contains("read_query"), "{msg}");
        assert!(msg.contains("write_query"), "{msg}");

        let err = check("DROP TABLE users", StatementRule::ReadOnly).unwrap_err();
        assert!(err.to_string().contains("DROP"));

        let err = check("CREATE TABLE t (id INT)", StatementRule::ReadOnly).unwrap_err();
        assert!(err.to_string().contains("create_table"));
    }

    #[test]
    fn test_explain_of_write_is_not_read_only() {
        assert!(check("EXPLAIN DELETE FROM users", StatementRule::ReadOnly).is_err());
    }

    #[test]
    fn test_insert_select_is_a_write() {
        let sql = "INSERT INTO archive SELECT * FROM users WHERE created_at < '2020-01-01'";
        assert!(check(sql, StatementRule::ReadOnly).is_err());
        assert!(check(sql, StatementRule::AnyWrite).is_ok());
    }

    #[test]
    fn test_create_table_rule() {
        let ok = check(
            "CREATE TABLE users (id INT PRIMARY KEY, email VARCHAR(255))",
            StatementRule::CreateTable,
        )
        .unwrap();
        assert_eq!(ok.operation, "CREATE TABLE");
        assert_eq!(ok.kind, SqlStatementType::Ddl);

        let err = check("DROP TABLE users", StatementRule::CreateTable).unwrap_err();
        assert!(err.to_string().contains("not accepted by create_table"));
    }

    #[test]
    fn test_update_and_delete_rules() {
        assert!(check("UPDATE users SET name = 'x' WHERE id = 1", StatementRule::Update).is_ok());
        assert!(check("DELETE FROM users WHERE id = 1", StatementRule::Delete).is_ok());

        let err = check("DELETE FROM users", StatementRule::Update).unwrap_err();
        assert!(err.to_string().contains("delete_query"));
        let err = check("UPDATE users SET a = 1", StatementRule::Delete).unwrap_err();
        assert!(err.to_string().contains("update_query"));
    }

    #[test]
    fn test_any_write_rejects_reads() {
        let err = check("SELECT 1", StatementRule::AnyWrite).unwrap_err();
        assert!(err.to_string().contains("read_query"));
        assert!(check("INSERT INTO t VALUES (1)", StatementRule::AnyWrite).is_ok());
        assert!(check("ALTER TABLE t ADD COLUMN c INT", StatementRule::AnyWrite).is_ok());
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let err = check("SELECT 1; DROP TABLE users", StatementRule::ReadOnly).unwrap_err();
        assert!(err.to_string().contains("Multiple statements"));
        assert!(check("INSERT INTO t VALUES (1); INSERT INTO t VALUES (2)", StatementRule::AnyWrite).is_err());
    }

    #[test]
    fn test_mysql_executable_comments_rejected() {
        for sql in [
            "SELECT 1 /*!; DELETE FROM users */",
            "SELECT 1; /*! DELETE FROM users */",
            "SELECT 1 /*!50000 ; DROP TABLE users */",
            "SELECT /*+ MAX_EXECUTION_TIME(1000) */ * FROM users",
        ] {
            let err = check(sql, StatementRule::ReadOnly).unwrap_err();
            assert!(matches!(err, DbError::InvalidInput { .. }), "{sql}");
            assert!(err.to_string().contains("executable comments"), "{sql}");
        }
        assert!(check("DELETE FROM users /*! WHERE 1 */", StatementRule::Delete).is_err());

        // ordinary comments are still fine
        assert!(check("SELECT 1 /* plain */", StatementRule::ReadOnly).is_ok());
        // only MySQL interprets the marker
        assert!(
            validate_statement("SELECT 1 /*! x */", DatabaseType::SQLite, StatementRule::ReadOnly)
                .is_ok()
        );
    }

    #[test]
    fn test_parse_error_is_invalid_sql() {
        let err = check("SELEC * FROM", StatementRule::ReadOnly).unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
        assert!(err.to_string().contains("Invalid SQL"));
    }

    #[test]
    fn test_dialects() {
        assert!(validate_statement("SELECT 1::int", DatabaseType::PostgreSQL, StatementRule::ReadOnly).is_ok());
        assert!(validate_statement("SELECT * FROM t LIMIT 1", DatabaseType::SQLite, StatementRule::ReadOnly).is_ok());
    }
}
