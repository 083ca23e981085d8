//! Migration artifacts: discovery, reconciliation against the ledger, and
//! generation of new migration files.
//!
//! A migration is a file named `<14 digit timestamp>_<description>.sql`. The
//! timestamp is only a sortable unique prefix; it is never validated as a
//! calendar time.

use crate::error::{CoreError, CoreResult};
use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Number of digits in a migration prefix
pub const PREFIX_LEN: usize = 14;

/// Body written into freshly generated migration files
pub const MIGRATION_TEMPLATE: &str = "-- Write your migration here";

/// `chrono` format producing a migration prefix
pub const PREFIX_FORMAT: &str = "%Y%m%d%H%M%S";

/// A migration file discovered on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// The 14 digit timestamp prefix; unique within a directory
    pub prefix: String,

    /// Remainder of the file name with underscores turned into spaces
    pub description: String,

    /// Location of the SQL file
    pub path: PathBuf,

    /// Set by [`reconcile`] when the ledger already lists this prefix
    #[serde(default)]
    pub applied: bool,
}

/// One row of the ledger table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Prefix of the applied migration
    pub name: String,

    /// Server-side time the row was written
    pub created_at: NaiveDateTime,
}

fn prefix_start() -> &'static Regex {
    static PREFIX_START: OnceLock<Regex> = OnceLock::new();
    PREFIX_START.get_or_init(|| Regex::new(r"^[0-9]{14}").expect("valid regex"))
}

fn migration_name() -> &'static Regex {
    static MIGRATION_NAME: OnceLock<Regex> = OnceLock::new();
    MIGRATION_NAME
        .get_or_init(|| Regex::new(r"^([0-9]{14})_(.*)\.sql$").expect("valid regex"))
}

/// Split a file name into `(prefix, description)`.
///
/// Returns `Ok(None)` for names that are not migrations at all (no leading
/// 14 digit run), and an error for names that start like a migration but do
/// not follow the full pattern.
pub fn parse_file_name(file_name: &str) -> Result<Option<(String, String)>, String> {
    if !prefix_start().is_match(file_name) {
        return Ok(None);
    }

    let caps = migration_name().captures(file_name).ok_or_else(|| {
        format!(
            "expected <{} digits>_<description>.sql, found '{}'",
            PREFIX_LEN, file_name
        )
    })?;

    let prefix = caps[1].to_string();
    let description = caps[2].replace('_', " ");
    Ok(Some((prefix, description)))
}

/// List the migrations in `dir`, ordered by prefix.
///
/// Entries without a leading 14 digit run are ignored. The first entry that
/// starts with one but is otherwise malformed fails the whole scan.
pub fn scan_migrations(dir: &Path) -> CoreResult<Vec<MigrationRecord>> {
    let meta = std::fs::metadata(dir).map_err(|e| CoreError::io(dir, e))?;
    if !meta.is_dir() {
        return Err(CoreError::NotADirectory {
            path: dir.display().to_string(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| CoreError::io(dir, e))?;
    let mut records = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| CoreError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            log::warn!("Skipping non UTF-8 file name in {}", dir.display());
            continue;
        };

        let parsed = parse_file_name(file_name).map_err(|reason| CoreError::MalformedArtifact {
            path: path.display().to_string(),
            reason,
        })?;

        if let Some((prefix, description)) = parsed {
            records.push(MigrationRecord {
                prefix,
                description,
                path,
                applied: false,
            });
        }
    }

    records.sort_by(|a, b| a.prefix.cmp(&b.prefix).then_with(|| a.path.cmp(&b.path)));

    if let Some(dup) = records.windows(2).find(|w| w[0].prefix == w[1].prefix) {
        return Err(CoreError::MalformedArtifact {
            path: dup[1].path.display().to_string(),
            reason: format!(
                "prefix {} is also used by {}",
                dup[1].prefix,
                dup[0].path.display()
            ),
        });
    }

    Ok(records)
}

/// Mark every scanned record whose prefix appears in the ledger as applied.
///
/// Order is preserved. Duplicate ledger names are tolerated.
pub fn reconcile(scanned: Vec<MigrationRecord>, ledger: &[LedgerEntry]) -> Vec<MigrationRecord> {
    let applied: HashSet<&str> = ledger.iter().map(|e| e.name.as_str()).collect();
    if applied.len() != ledger.len() {
        log::warn!("Ledger contains duplicate migration names");
    }

    scanned
        .into_iter()
        .map(|record| MigrationRecord {
            applied: applied.contains(record.prefix.as_str()),
            ..record
        })
        .collect()
}

/// Records not yet applied, in order
pub fn pending(records: &[MigrationRecord]) -> Vec<&MigrationRecord> {
    records.iter().filter(|r| !r.applied).collect()
}

/// Length of the longest description, used to align listings
pub fn longest_description(records: &[MigrationRecord]) -> usize {
    records
        .iter()
        .map(|r| r.description.chars().count())
        .max()
        .unwrap_or(0)
}

/// Write an empty migration named after `now` and `description`.
///
/// Spaces in the description become underscores. Existing files are never
/// overwritten.
pub fn generate_migration(
    dir: &Path,
    description: &str,
    now: NaiveDateTime,
) -> CoreResult<PathBuf> {
    let description = description.trim();
    if description.is_empty() {
        return Err(CoreError::ConfigInvalid {
            message: "migration description must not be empty".to_string(),
        });
    }

    let file_name = format!(
        "{}_{}.sql",
        now.format(PREFIX_FORMAT),
        description.replace(' ', "_")
    );
    let path = dir.join(file_name);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => CoreError::MigrationExists {
                path: path.display().to_string(),
            },
            _ => CoreError::io(&path, e),
        })?;
    file.write_all(MIGRATION_TEMPLATE.as_bytes())
        .map_err(|e| CoreError::io(&path, e))?;

    Ok(path)
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
