//! mg-db - Database abstraction layer for Migrant
//!
//! This crate provides the `Database` trait consumed by the migration engine
//! and three implementations: DuckDB, SQLite and MySQL.

pub mod duckdb;
pub mod error;
pub mod mysql;
pub mod sql_utils;
pub mod sqlite;
pub mod traits;

pub use crate::duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use crate::mysql::MySqlBackend;
pub use crate::sqlite::SqliteBackend;
pub use traits::Database;

use mg_core::{DatabaseConfig, DbType};
use std::sync::Arc;

/// Open a connection for a resolved database config
pub async fn connect(config: &DatabaseConfig) -> DbResult<Arc<dyn Database>> {
    log::debug!("Connecting to {} database '{}'", config.driver, config.name);
    let db: Arc<dyn Database> = match config.driver {
        DbType::DuckDb => Arc::new(DuckDbBackend::new(&config.uri)?),
        DbType::Sqlite => Arc::new(SqliteBackend::new(&config.uri)?),
        DbType::MySql => Arc::new(MySqlBackend::connect(&config.uri).await?),
    };
    Ok(db)
}
