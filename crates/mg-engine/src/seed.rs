//! Seed runner: templated inserts driven by seed files.

use crate::error::{EngineError, EngineResult};
use crate::reset::truncate_tables;
use mg_core::SeedSpec;
use mg_db::Database;
use mg_template::{CollectedIds, SeedTemplates};
use std::path::{Path, PathBuf};

/// Outcome of a seed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub files: usize,
    pub rows: usize,
}

/// Apply seed files in order. The first failure stops the whole run.
///
/// Ids collected in one file are never visible to the next.
pub async fn apply_seeds(db: &dyn Database, files: &[PathBuf]) -> EngineResult<SeedSummary> {
    let mut summary = SeedSummary::default();

    for (index, file) in files.iter().enumerate() {
        let file_index = index + 1;
        let spec = SeedSpec::load(file).map_err(|source| EngineError::SeedParse {
            file: file.display().to_string(),
            file_index,
            source,
        })?;

        log::debug!("Seeding from {} ({} rows)", file.display(), spec.row_count());
        summary.rows += apply_seed_file(db, &spec, file, file_index).await?;
        summary.files += 1;
    }

    log::info!(
        "Seeded {} row(s) from {} file(s)",
        summary.rows,
        summary.files
    );
    Ok(summary)
}

/// Truncate every table but the ledger, then apply the seed files.
pub async fn seed_database(db: &dyn Database, files: &[PathBuf]) -> EngineResult<SeedSummary> {
    let truncated = truncate_tables(db).await?;
    log::info!("Truncated {} table(s)", truncated);
    apply_seeds(db, files).await
}

async fn apply_seed_file(
    db: &dyn Database,
    spec: &SeedSpec,
    file: &Path,
    file_index: usize,
) -> EngineResult<usize> {
    let templates = SeedTemplates::new(&spec.variables);
    let mut ids = CollectedIds::new();
    let mut inserted = 0;

    for group in &spec.groups {
        for (row_index, row) in group.rows.iter().enumerate() {
            let mut columns = Vec::with_capacity(row.columns.len());
            let mut values = Vec::with_capacity(row.columns.len());

            for (column, expression) in &row.columns {
                let value = templates.render(expression, &ids).map_err(|source| {
                    EngineError::Template {
                        file: file.display().to_string(),
                        file_index,
                        table: group.table.clone(),
                        row: row_index,
                        column: column.clone(),
                        source,
                    }
                })?;
                columns.push(column.clone());
                values.push(value);
            }

            let id = db
                .insert_row(&group.table, &columns, &values)
                .await
                .map_err(|source| EngineError::SqlExecution {
                    context: format!(
                        "Seed processing stopped at file {} ({}), table '{}', row {}",
                        file_index,
                        file.display(),
                        group.table,
                        row_index
                    ),
                    source,
                })?;

            log::debug!("Inserted row {} into {} (id {:?})", row_index, group.table, id);
            ids.record(&group.table, id);
            inserted += 1;
        }
    }

    Ok(inserted)
}

#[cfg(test)]
#[path = "seed_test.rs"]
mod tests;
