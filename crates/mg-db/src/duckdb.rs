//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::sql_utils::{
    insert_statement, quote_ident, quote_literal, quote_qualified, sibling_database,
    split_qualified_name,
};
use crate::traits::Database;
use async_trait::async_trait;
use duckdb::{params, params_from_iter, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// DuckDB database backend
///
/// DuckDB has no auto-increment columns; a column whose default draws from a
/// sequence (`DEFAULT nextval('seq')`) is treated as the generated key.
/// Foreign key enforcement cannot be switched off, so
/// [`set_foreign_key_checks`](Database::set_foreign_key_checks) is a no-op.
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", e, path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.conn.lock()?;
        conn.execute(sql, [])
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.conn.lock()?;
        conn.execute_batch(sql).map_err(DbError::from)
    }

    fn query_rows_sync(&self, sql: &str) -> DbResult<Vec<Vec<String>>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(sql)?;

        // Column count is only known once the statement has run.
        let rows = stmt
            .query_map([], |row| {
                let col_count = row.as_ref().column_count();
                Ok((0..col_count)
                    .map(|i| column_as_string(row, i))
                    .collect::<Vec<_>>())
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn query_count_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.conn.lock()?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM ({})", sql), [], |row| {
                row.get(0)
            })
            .map_err(DbError::from)?;
        Ok(count as usize)
    }

    /// Name of the first column whose default is a sequence, if any
    ///
    /// Identifiers resolve case-insensitively, and an unqualified name
    /// belongs to the connection's current schema.
    fn generated_key_column(conn: &Connection, table: &str) -> DbResult<Option<String>> {
        let (schema, name) = schema_and_name(table);
        let mut stmt = conn.prepare(
            "SELECT column_name FROM information_schema.columns \
             WHERE lower(table_schema) = lower(coalesce(CAST(? AS VARCHAR), current_schema())) \
               AND lower(table_name) = lower(?) \
               AND column_default LIKE 'nextval(%' \
             ORDER BY ordinal_position LIMIT 1",
        )?;
        let columns = stmt
            .query_map(params![schema, name], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns.into_iter().next())
    }

    fn insert_row_sync(
        &self,
        table: &str,
        columns: &[String],
        values: &[String],
    ) -> DbResult<Option<i64>> {
        let conn = self.conn.lock()?;
        let sql = insert_statement(table, columns);

        match Self::generated_key_column(&conn, table)? {
            Some(key) => {
                let sql = format!("{} RETURNING {}", sql, quote_ident(&key));
                let id: i64 = conn
                    .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))
                    .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))?;
                Ok(Some(id))
            }
            None => {
                conn.execute(&sql, params_from_iter(values.iter()))
                    .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))?;
                Ok(None)
            }
        }
    }

    fn list_tables_sync(&self) -> DbResult<Vec<String>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_catalog = current_database() \
               AND table_schema = current_schema() \
               AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
        )?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tables)
    }

    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        let conn = self.conn.lock()?;
        let (schema, table) = schema_and_name(name);

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE lower(table_schema) = lower(coalesce(CAST(? AS VARCHAR), current_schema())) \
                   AND lower(table_name) = lower(?)",
                params![schema, table],
                |row| row.get(0),
            )
            .map_err(DbError::from)?;

        Ok(count > 0)
    }
}

/// Split an optionally qualified name; `None` stands for the current schema.
fn schema_and_name(name: &str) -> (Option<&str>, &str) {
    match split_qualified_name(name, "") {
        ("", table) => (None, table),
        (schema, table) => (Some(schema), table),
    }
}

/// Read a column value as a String, trying the common DuckDB types in turn.
fn column_as_string(row: &duckdb::Row<'_>, idx: usize) -> String {
    if let Ok(Some(s)) = row.get::<_, Option<String>>(idx) {
        return s;
    }
    if let Ok(Some(n)) = row.get::<_, Option<i64>>(idx) {
        return n.to_string();
    }
    if let Ok(Some(f)) = row.get::<_, Option<f64>>(idx) {
        return f.to_string();
    }
    if let Ok(Some(b)) = row.get::<_, Option<bool>>(idx) {
        return b.to_string();
    }
    String::new()
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_sync(sql)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<String>>> {
        self.query_rows_sync(sql)
    }

    async fn query_count(&self, sql: &str) -> DbResult<usize> {
        self.query_count_sync(sql)
    }

    async fn insert_row(
        &self,
        table: &str,
        columns: &[String],
        values: &[String],
    ) -> DbResult<Option<i64>> {
        self.insert_row_sync(table, columns, values)
    }

    async fn list_tables(&self) -> DbResult<Vec<String>> {
        self.list_tables_sync()
    }

    async fn truncate_table(&self, name: &str) -> DbResult<()> {
        self.execute_sync(&format!("TRUNCATE {}", quote_qualified(name)))?;
        Ok(())
    }

    async fn drop_table(&self, name: &str) -> DbResult<()> {
        self.execute_sync(&format!("DROP TABLE IF EXISTS {}", quote_qualified(name)))?;
        Ok(())
    }

    async fn create_database(&self, name: &str) -> DbResult<()> {
        let file = sibling_database(self.path.as_deref(), name, "duckdb");
        if self.path.is_some() && Path::new(&file).exists() {
            return Err(DbError::ExecutionError(format!(
                "database file already exists: {}",
                file
            )));
        }
        log::debug!("Attaching new database {} at {}", name, file);
        self.execute_batch_sync(&format!(
            "ATTACH {} AS {}",
            quote_literal(&file),
            quote_ident(name)
        ))
    }

    async fn set_foreign_key_checks(&self, enabled: bool) -> DbResult<()> {
        log::debug!(
            "DuckDB always enforces foreign keys; ignoring request to set checks to {}",
            enabled
        );
        Ok(())
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
