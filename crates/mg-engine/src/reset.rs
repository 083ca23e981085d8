//! Schema reset utilities: drop or truncate every table, create databases.

use crate::error::{EngineError, EngineResult};
use crate::ledger::{init_ledger_table, TrialRead, LEDGER_TABLE};
use crate::migrate::{apply_migrations, check_migrations, ApplySummary};
use mg_db::{Database, DbResult};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
enum TableAction {
    Drop,
    Truncate,
}

impl TableAction {
    async fn run(self, db: &dyn Database, table: &str) -> DbResult<()> {
        match self {
            TableAction::Drop => db.drop_table(table).await,
            TableAction::Truncate => db.truncate_table(table).await,
        }
    }
}

impl fmt::Display for TableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableAction::Drop => write!(f, "drop"),
            TableAction::Truncate => write!(f, "truncate"),
        }
    }
}

/// Drop every table in the active schema, the ledger included.
///
/// Returns the number of tables dropped.
pub async fn drop_all_tables(db: &dyn Database) -> EngineResult<usize> {
    let tables = db.list_tables().await?;
    with_foreign_keys_suspended(db, run_passes(db, tables, TableAction::Drop)).await
}

/// Empty every table except the ledger.
///
/// Returns the number of tables truncated.
pub async fn truncate_tables(db: &dyn Database) -> EngineResult<usize> {
    let tables = db
        .list_tables()
        .await?
        .into_iter()
        .filter(|t| t != LEDGER_TABLE)
        .collect();
    with_foreign_keys_suspended(db, run_passes(db, tables, TableAction::Truncate)).await
}

/// Drop everything, recreate the ledger and apply every migration in `dir`.
pub async fn reset_database(db: &dyn Database, dir: &Path) -> EngineResult<ApplySummary> {
    let dropped = drop_all_tables(db).await?;
    log::info!("Dropped {} table(s)", dropped);

    init_ledger_table(db, &TrialRead).await?;
    let records = check_migrations(db, dir).await?;
    apply_migrations(db, &records).await
}

/// Create an empty database called `name` alongside the connected one.
///
/// The name must be a plain identifier: ASCII letters, digits and
/// underscores, not starting with a digit.
pub async fn create_database(db: &dyn Database, name: &str) -> EngineResult<()> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(EngineError::InvalidDatabaseName(name.to_string()));
    }

    db.create_database(name)
        .await
        .map_err(|source| EngineError::SqlExecution {
            context: format!("Failed to create database {}", name),
            source,
        })?;
    log::info!("Created database {}", name);
    Ok(())
}

async fn with_foreign_keys_suspended<F>(db: &dyn Database, work: F) -> EngineResult<usize>
where
    F: std::future::Future<Output = EngineResult<usize>>,
{
    db.set_foreign_key_checks(false).await?;
    let result = work.await;
    let restored = db.set_foreign_key_checks(true).await;

    let count = result?;
    restored?;
    Ok(count)
}

/// Apply `action` to every table, retrying failures while a pass makes
/// progress. Backends that cannot suspend foreign key checks reject
/// statements on referenced tables until their dependents are gone.
async fn run_passes(
    db: &dyn Database,
    mut remaining: Vec<String>,
    action: TableAction,
) -> EngineResult<usize> {
    let mut done = 0;

    loop {
        let attempted = remaining.len();
        let mut failed = Vec::new();
        let mut first_error = None;

        for table in remaining {
            match action.run(db, &table).await {
                Ok(()) => {
                    log::debug!("{} table {}", action, table);
                    done += 1;
                }
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some((table.clone(), e));
                    }
                    failed.push(table);
                }
            }
        }

        match first_error {
            None => return Ok(done),
            Some((table, source)) if failed.len() == attempted => {
                return Err(EngineError::SqlExecution {
                    context: format!("Failed to {} table {}", action, table),
                    source,
                });
            }
            Some((table, source)) => {
                log::debug!(
                    "Retrying {} table(s) after {} of {} failed: {}",
                    failed.len(),
                    action,
                    table,
                    source
                );
                remaining = failed;
            }
        }
    }
}

#[cfg(test)]
#[path = "reset_test.rs"]
mod tests;
