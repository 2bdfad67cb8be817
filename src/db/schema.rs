//! Schema introspection for MySQL, PostgreSQL and SQLite.
//!
//! SQL queries live in the `queries` submodule with constants for each
//! database type. Database-specific implementations are in their respective
//! submodules, each providing the same interface.

use crate::db::pool::DbPool;
use crate::error::{DbError, DbResult};
use crate::models::ColumnInfo;
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// Database names visible to the connected user, sorted.
    pub async fn list_databases(pool: &DbPool) -> DbResult<Vec<String>> {
        match pool {
            DbPool::MySql(p) => mysql::list_databases(p).await,
            DbPool::Postgres(p) => postgres::list_databases(p).await,
            DbPool::SQLite(p) => sqlite::list_databases(p).await,
        }
    }

    /// Tables and views of the current database, sorted by name.
    pub async fn list_tables(pool: &DbPool) -> DbResult<Vec<String>> {
        match pool {
            DbPool::MySql(p) => mysql::list_tables(p).await,
            DbPool::Postgres(p) => postgres::list_tables(p).await,
            DbPool::SQLite(p) => sqlite::list_tables(p).await,
        }
    }

    /// Columns of `table_name` in ordinal order.
    ///
    /// MySQL and PostgreSQL accept a `schema.table` qualified name.
    pub async fn describe_table(pool: &DbPool, table_name: &str) -> DbResult<Vec<ColumnInfo>> {
        let (schema, table) = split_qualified(table_name);
        let columns = match pool {
            DbPool::MySql(p) => mysql::describe_table(p, schema, table).await?,
            DbPool::Postgres(p) => postgres::describe_table(p, schema, table).await?,
            DbPool::SQLite(p) => sqlite::describe_table(p, table_name).await?,
        };
        if columns.is_empty() {
            return Err(DbError::schema(
                format!("Table '{}' not found", table_name),
                table_name.to_string(),
            ));
        }
        Ok(columns)
    }
}

/// Split `schema.table` into its parts; unqualified names get no schema.
fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((schema, table)) if !schema.is_empty() && !table.is_empty() => (Some(schema), table),
        _ => (None, name),
    }
}

mod queries {
    pub mod mysql {
        pub const LIST_DATABASES: &str = "SHOW DATABASES";

        pub const LIST_TABLES: &str = "SHOW TABLES";

        pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME,
            CONVERT(COLUMN_TYPE USING utf8mb4) AS COLUMN_TYPE,
            CONVERT(IS_NULLABLE USING utf8mb4) AS IS_NULLABLE,
            CONVERT(COLUMN_DEFAULT USING utf8mb4) AS COLUMN_DEFAULT,
            CONVERT(COLUMN_KEY USING utf8mb4) AS COLUMN_KEY,
            CONVERT(EXTRA USING utf8mb4) AS EXTRA
        FROM information_schema.columns
        WHERE TABLE_NAME = ? AND TABLE_SCHEMA = COALESCE(?, DATABASE())
        ORDER BY ORDINAL_POSITION
        "#;
    }

    pub mod postgres {
        pub const LIST_DATABASES: &str = r#"
            SELECT datname AS name
            FROM pg_database
            WHERE datistemplate = false
            ORDER BY datname
            "#;

        pub const LIST_TABLES: &str = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_type IN ('BASE TABLE', 'VIEW')
            ORDER BY table_name
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            c.column_name::text AS column_name,
            format_type(a.atttypid, a.atttypmod) AS column_type,
            c.is_nullable::text AS is_nullable,
            c.column_default::text AS column_default,
            CASE WHEN pk.column_name IS NOT NULL THEN 'PRI' ELSE '' END AS column_key
        FROM information_schema.columns c
        JOIN pg_class t ON t.relname = c.table_name
        JOIN pg_namespace n ON n.oid = t.relnamespace AND n.nspname = c.table_schema
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attname = c.column_name
        LEFT JOIN (
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.table_name = $1
            AND tc.table_schema = COALESCE($2, current_schema())
            AND tc.constraint_type = 'PRIMARY KEY'
        ) pk ON c.column_name = pk.column_name
        WHERE c.table_name = $1 AND c.table_schema = COALESCE($2, current_schema())
        ORDER BY c.ordinal_position
        "#;
    }

    pub mod sqlite {
        pub const LIST_DATABASES: &str = "PRAGMA database_list";

        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type IN ('table', 'view')
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;
    }
}

mod mysql {
    use super::*;
    use sqlx::mysql::MySqlRow;
    use sqlx::{MySqlPool, Row};

    /// Safely get an optional string from a MySQL row.
    /// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
    fn get_optional_string(row: &MySqlRow, column: &str) -> Option<String> {
        row.try_get::<Option<String>, _>(column)
            .ok()
            .flatten()
            .or_else(|| {
                row.try_get::<Option<Vec<u8>>, _>(column)
                    .ok()
                    .flatten()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
    }

    fn get_string(row: &MySqlRow, column: &str) -> String {
        get_optional_string(row, column).unwrap_or_default()
    }

    fn get_string_by_index(row: &MySqlRow, index: usize) -> Option<String> {
        row.try_get::<String, _>(index).ok().or_else(|| {
            row.try_get::<Vec<u8>, _>(index)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
    }

    /// Single-column `SHOW ...` output as a sorted list of names.
    async fn show_names(pool: &MySqlPool, sql: &str) -> DbResult<Vec<String>> {
        let rows = sqlx::query(sql).fetch_all(pool).await?;
        let mut names: Vec<String> = rows
            .iter()
            .filter_map(|row| get_string_by_index(row, 0))
            .collect();
        names.sort();
        Ok(names)
    }

    pub async fn list_databases(pool: &MySqlPool) -> DbResult<Vec<String>> {
        let names = show_names(pool, queries::mysql::LIST_DATABASES).await?;
        debug!(count = names.len(), "Listed MySQL databases");
        Ok(names)
    }

    pub async fn list_tables(pool: &MySqlPool) -> DbResult<Vec<String>> {
        // Fails with "No database selected" when no default schema is set
        let names = show_names(pool, queries::mysql::LIST_TABLES).await?;
        debug!(count = names.len(), "Listed MySQL tables");
        Ok(names)
    }

    pub async fn describe_table(
        pool: &MySqlPool,
        schema: Option<&str>,
        table_name: &str,
    ) -> DbResult<Vec<ColumnInfo>> {
        let rows = sqlx::query(queries::mysql::DESCRIBE_COLUMNS)
            .bind(table_name)
            .bind(schema)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let nullable = get_string(row, "IS_NULLABLE").eq_ignore_ascii_case("YES");
                ColumnInfo::new(
                    get_string(row, "COLUMN_NAME"),
                    get_string(row, "COLUMN_TYPE"),
                    nullable,
                )
                .with_key(get_string(row, "COLUMN_KEY"))
                .with_default(get_optional_string(row, "COLUMN_DEFAULT"))
                .with_extra(get_optional_string(row, "EXTRA"))
            })
            .collect())
    }
}

mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    pub async fn list_databases(pool: &PgPool) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::postgres::LIST_DATABASES)
            .fetch_all(pool)
            .await?;
        let names: Vec<String> = rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>("name").ok())
            .collect();
        debug!(count = names.len(), "Listed PostgreSQL databases");
        Ok(names)
    }

    pub async fn list_tables(pool: &PgPool) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::postgres::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        let names: Vec<String> = rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>("table_name").ok())
            .collect();
        debug!(count = names.len(), "Listed PostgreSQL tables");
        Ok(names)
    }

    pub async fn describe_table(
        pool: &PgPool,
        schema: Option<&str>,
        table_name: &str,
    ) -> DbResult<Vec<ColumnInfo>> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_COLUMNS)
            .bind(table_name)
            .bind(schema)
            .fetch_all(pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.try_get("column_name").unwrap_or_default();
                let data_type: String = row.try_get("column_type").unwrap_or_default();
                let nullable: String = row.try_get("is_nullable").unwrap_or_default();
                let key: String = row.try_get("column_key").unwrap_or_default();
                let default: Option<String> = row.try_get("column_default").ok().flatten();
                ColumnInfo::new(name, data_type, nullable.eq_ignore_ascii_case("YES"))
                    .with_key(key)
                    .with_default(default)
            })
            .collect())
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqlitePool};

    /// Quote an identifier for use inside a PRAGMA argument.
    fn quote_literal(name: &str) -> String {
        format!("'{}'", name.replace('\'', "''"))
    }

    pub async fn list_databases(pool: &SqlitePool) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::sqlite::LIST_DATABASES)
            .fetch_all(pool)
            .await?;
        // "main" first, then attached databases in attach order
        let names: Vec<String> = rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>("name").ok())
            .collect();
        debug!(count = names.len(), "Listed SQLite databases");
        Ok(names)
    }

    pub async fn list_tables(pool: &SqlitePool) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::sqlite::LIST_TABLES)
            .fetch_all(pool)
            .await?;
        let names: Vec<String> = rows.iter().map(|row| row.get("name")).collect();
        debug!(count = names.len(), "Listed SQLite tables");
        Ok(names)
    }

    pub async fn describe_table(pool: &SqlitePool, table_name: &str) -> DbResult<Vec<ColumnInfo>> {
        let pragma_query = format!("PRAGMA table_info({})", quote_literal(table_name));
        let rows = sqlx::query(&pragma_query).fetch_all(pool).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get("name");
                let data_type: String = row.get("type");
                let notnull: i32 = row.get("notnull");
                let default: Option<String> = row.try_get("dflt_value").ok().flatten();
                let pk: i32 = row.get("pk");

                ColumnInfo::new(name, data_type, notnull == 0)
                    .with_key(if pk > 0 { "PRI" } else { "" })
                    .with_default(default)
            })
            .collect())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_quote_literal_escapes_quotes() {
            assert_eq!(quote_literal("users"), "'users'");
            assert_eq!(quote_literal("o'brien"), "'o''brien'");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("users"), (None, "users"));
        assert_eq!(split_qualified("shop.users"), (Some("shop"), "users"));
        assert_eq!(split_qualified(".users"), (None, ".users"));
        assert_eq!(split_qualified("shop."), (None, "shop."));
    }
}
