//! SQLite database backend implementation

use crate::error::{DbError, DbResult};
use crate::sql_utils::{
    insert_statement, quote_ident, quote_literal, quote_qualified, sibling_database,
    split_qualified_name,
};
use crate::traits::Database;
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// SQLite database backend
///
/// Foreign key enforcement is switched on when the connection opens, matching
/// what server databases do by default.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteBackend {
    /// Create a new in-memory SQLite connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Self::with_connection(conn, None)
    }

    /// Create a new SQLite connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", e, path.display())))?;
        Self::with_connection(conn, Some(path.to_path_buf()))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> DbResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
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
        let col_count = stmt.column_count();

        let rows = stmt
            .query_map([], |row| {
                (0..col_count)
                    .map(|i| row.get_ref(i).map(value_as_string))
                    .collect::<Result<Vec<_>, _>>()
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

    /// True when the table has an `INTEGER PRIMARY KEY` aliasing the rowid
    ///
    /// `WITHOUT ROWID` tables never update `last_insert_rowid()`, so they
    /// report no generated key even when declared with one.
    fn has_rowid_key(conn: &Connection, table: &str) -> DbResult<bool> {
        let (schema, name) = split_qualified_name(table, "main");
        let without_rowid = conn
            .query_row(
                "SELECT wr FROM pragma_table_list WHERE schema = ?1 AND name = ?2 COLLATE NOCASE",
                params![schema, name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some_and(|wr| wr != 0);
        if without_rowid {
            return Ok(false);
        }

        let mut stmt = conn.prepare("SELECT type, pk FROM pragma_table_info(?1, ?2)")?;
        let keys = stmt
            .query_map(params![name, schema], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|(_, pk)| *pk > 0)
            .collect::<Vec<_>>();

        Ok(matches!(keys.as_slice(), [(ty, _)] if ty.eq_ignore_ascii_case("INTEGER")))
    }

    fn insert_row_sync(
        &self,
        table: &str,
        columns: &[String],
        values: &[String],
    ) -> DbResult<Option<i64>> {
        let conn = self.conn.lock()?;
        let sql = insert_statement(table, columns);
        conn.execute(&sql, params_from_iter(values.iter()))
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))?;

        if Self::has_rowid_key(&conn, table)? {
            Ok(Some(conn.last_insert_rowid()))
        } else {
            Ok(None)
        }
    }

    fn list_tables_sync(&self) -> DbResult<Vec<String>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tables)
    }

    fn truncate_table_sync(&self, name: &str) -> DbResult<()> {
        let conn = self.conn.lock()?;
        let sql = format!("DELETE FROM {}", quote_qualified(name));
        conn.execute(&sql, [])
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))?;

        // AUTOINCREMENT counters live in sqlite_sequence, which only exists
        // once such a table has been created.
        let has_sequence: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'",
            [],
            |row| row.get(0),
        )?;
        if has_sequence > 0 {
            let (_, table) = split_qualified_name(name, "main");
            conn.execute("DELETE FROM sqlite_sequence WHERE name = ?", params![table])?;
        }
        Ok(())
    }

    fn relation_exists_sync(&self, name: &str) -> DbResult<bool> {
        let conn = self.conn.lock()?;
        let (schema, table) = split_qualified_name(name, "main");
        let sql = format!(
            "SELECT COUNT(*) FROM {}.sqlite_master WHERE type IN ('table', 'view') AND name = ?",
            quote_ident(schema)
        );
        let count: i64 = conn
            .query_row(&sql, params![table], |row| row.get(0))
            .map_err(DbError::from)?;
        Ok(count > 0)
    }
}

fn value_as_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(n) => n.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
    }
}

#[async_trait]
impl Database for SqliteBackend {
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
        self.truncate_table_sync(name)
    }

    async fn drop_table(&self, name: &str) -> DbResult<()> {
        self.execute_sync(&format!("DROP TABLE IF EXISTS {}", quote_qualified(name)))?;
        Ok(())
    }

    async fn create_database(&self, name: &str) -> DbResult<()> {
        let file = sibling_database(self.path.as_deref(), name, "db");
        if self.path.is_some() && Path::new(&file).exists() {
            return Err(DbError::ExecutionError(format!(
                "database file already exists: {}",
                file
            )));
        }
        log::debug!("Attaching new database {} at {}", name, file);
        self.execute_batch_sync(&format!(
            "ATTACH DATABASE {} AS {}",
            quote_literal(&file),
            quote_ident(name)
        ))
    }

    async fn set_foreign_key_checks(&self, enabled: bool) -> DbResult<()> {
        let pragma = if enabled {
            "PRAGMA foreign_keys = ON"
        } else {
            "PRAGMA foreign_keys = OFF"
        };
        self.execute_batch_sync(pragma)
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        self.relation_exists_sync(name)
    }

    fn db_type(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
#[path = "sqlite_test.rs"]
mod tests;
