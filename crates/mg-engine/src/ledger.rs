//! The migration ledger: one row per applied migration.

use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use mg_core::LedgerEntry;
use mg_db::{Database, DbResult};

/// Name of the ledger table
pub const LEDGER_TABLE: &str = "migrations";

const LEDGER_DDL: &str = "CREATE TABLE migrations(\
    name VARCHAR(14) NOT NULL, \
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)";

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Facts about a target database, computed on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStat {
    pub has_ledger_table: bool,
}

/// How the engine decides whether the ledger table exists
#[async_trait]
pub trait LedgerPresence: Send + Sync {
    async fn ledger_exists(&self, db: &dyn Database) -> EngineResult<bool>;
}

/// Infer existence from whether a trivial read succeeds.
///
/// Any failure of the read counts as "absent" and is never reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrialRead;

#[async_trait]
impl LedgerPresence for TrialRead {
    async fn ledger_exists(&self, db: &dyn Database) -> EngineResult<bool> {
        let sql = format!("SELECT 1 FROM {} LIMIT 1", LEDGER_TABLE);
        match db.query_rows(&sql).await {
            Ok(_) => Ok(true),
            Err(e) => {
                log::debug!("Ledger trial read failed, treating table as absent: {}", e);
                Ok(false)
            }
        }
    }
}

/// Ask the database catalog
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogLookup;

#[async_trait]
impl LedgerPresence for CatalogLookup {
    async fn ledger_exists(&self, db: &dyn Database) -> EngineResult<bool> {
        Ok(db.relation_exists(LEDGER_TABLE).await?)
    }
}

/// Report whether the ledger table exists. Never creates anything.
pub async fn stat<P>(db: &dyn Database, presence: &P) -> EngineResult<DatabaseStat>
where
    P: LedgerPresence + ?Sized,
{
    Ok(DatabaseStat {
        has_ledger_table: presence.ledger_exists(db).await?,
    })
}

/// Create the ledger table unless it is already there.
///
/// Returns `true` when the table was created by this call.
pub async fn init_ledger_table<P>(db: &dyn Database, presence: &P) -> EngineResult<bool>
where
    P: LedgerPresence + ?Sized,
{
    if presence.ledger_exists(db).await? {
        return Ok(false);
    }

    log::debug!("Creating ledger table {}", LEDGER_TABLE);
    db.execute_batch(LEDGER_DDL)
        .await
        .map_err(|source| EngineError::SqlExecution {
            context: format!("Failed to create ledger table {}", LEDGER_TABLE),
            source,
        })?;
    Ok(true)
}

/// Read every ledger row. Row order is unspecified.
pub async fn read_ledger(db: &dyn Database) -> EngineResult<Vec<LedgerEntry>> {
    let sql = format!(
        "SELECT name, CAST(created_at AS CHAR) FROM {}",
        LEDGER_TABLE
    );
    let rows = db
        .query_rows(&sql)
        .await
        .map_err(|e| EngineError::LedgerUnavailable(e.to_string()))?;

    rows.into_iter()
        .map(|row| match row.as_slice() {
            [name, created_at] => Ok(LedgerEntry {
                name: name.clone(),
                created_at: parse_timestamp(created_at)?,
            }),
            _ => Err(EngineError::LedgerUnavailable(format!(
                "expected 2 columns, got {}",
                row.len()
            ))),
        })
        .collect()
}

/// Record a migration prefix as applied
pub async fn record_applied(db: &dyn Database, prefix: &str) -> DbResult<()> {
    db.insert_row(LEDGER_TABLE, &["name".to_string()], &[prefix.to_string()])
        .await?;
    Ok(())
}

fn parse_timestamp(value: &str) -> EngineResult<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| {
            EngineError::LedgerUnavailable(format!("unrecognised created_at value '{}'", value))
        })
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
