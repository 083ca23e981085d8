//! Reconcile migration files with the ledger and apply what is pending.

use crate::error::{EngineError, EngineResult};
use crate::ledger::{read_ledger, record_applied};
use mg_core::{reconcile, scan_migrations, MigrationRecord};
use mg_db::Database;
use std::path::Path;

/// Outcome of an apply run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Prefixes applied by this run, in order
    pub applied: Vec<String>,
}

/// Scan `dir`, read the ledger and mark each migration applied or not.
///
/// The ledger table must already exist.
pub async fn check_migrations(db: &dyn Database, dir: &Path) -> EngineResult<Vec<MigrationRecord>> {
    let scanned = scan_migrations(dir)?;
    let ledger = read_ledger(db).await?;
    Ok(reconcile(scanned, &ledger))
}

/// Apply every unapplied record in order, stopping at the first failure.
///
/// Each migration's prefix is written to the ledger right after its SQL
/// succeeds. Nothing is rolled back: migrations before a failing one stay
/// applied and later ones are never attempted.
pub async fn apply_migrations(
    db: &dyn Database,
    records: &[MigrationRecord],
) -> EngineResult<ApplySummary> {
    let mut summary = ApplySummary::default();

    for record in records.iter().filter(|r| !r.applied) {
        let path = record.path.display().to_string();
        let sql =
            std::fs::read_to_string(&record.path).map_err(|source| EngineError::ReadArtifact {
                path: path.clone(),
                source,
            })?;

        log::debug!("Applying migration {} ({})", record.prefix, record.description);

        let apply_error = |source| EngineError::Apply {
            prefix: record.prefix.clone(),
            path: path.clone(),
            source,
        };
        db.execute_batch(&sql).await.map_err(apply_error)?;
        record_applied(db, &record.prefix)
            .await
            .map_err(apply_error)?;

        summary.applied.push(record.prefix.clone());
    }

    log::info!("Applied {} migration(s)", summary.applied.len());
    Ok(summary)
}

#[cfg(test)]
#[path = "migrate_test.rs"]
mod tests;
