//! Database trait definition

use crate::error::DbResult;
use async_trait::async_trait;

/// Database handle consumed by the migration engine
///
/// Implementations wrap a single connection; the engine never asks for a
/// second one and issues statements strictly one after another.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute SQL that modifies data, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute multiple SQL statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query and return every value rendered as text
    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Vec<String>>>;

    /// Execute query returning row count
    async fn query_count(&self, sql: &str) -> DbResult<usize>;

    /// Insert one row with bound string parameters.
    ///
    /// Returns the database-generated identifier of the new row, or `None`
    /// when the table has no generated key column.
    async fn insert_row(
        &self,
        table: &str,
        columns: &[String],
        values: &[String],
    ) -> DbResult<Option<i64>>;

    /// Every base table in the active schema
    async fn list_tables(&self) -> DbResult<Vec<String>>;

    /// Remove all rows from a table, keeping its definition
    async fn truncate_table(&self, name: &str) -> DbResult<()>;

    /// Drop a table if it exists
    async fn drop_table(&self, name: &str) -> DbResult<()>;

    /// Create a new, empty database called `name` on the same server.
    ///
    /// File-based backends create a sibling database file and attach it to
    /// this connection under `name`.
    async fn create_database(&self, name: &str) -> DbResult<()>;

    /// Switch enforcement of foreign key constraints on or off
    async fn set_foreign_key_checks(&self, enabled: bool) -> DbResult<()>;

    /// Check the catalog for a table or view
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
