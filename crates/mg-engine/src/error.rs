//! Error types for mg-engine

use mg_core::CoreError;
use mg_db::DbError;
use mg_template::TemplateError;
use thiserror::Error;

/// Errors raised while migrating, resetting or seeding a database
#[derive(Error, Debug)]
pub enum EngineError {
    /// E001: The ledger table is missing or could not be read
    #[error("[E001] Migration ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// E002: A migration's SQL, or recording it in the ledger, failed
    #[error("[E002] Migration {prefix} failed ({path}): {source}")]
    Apply {
        prefix: String,
        path: String,
        #[source]
        source: DbError,
    },

    /// E003: A migration file could not be read
    #[error("[E003] Failed to read migration {path}: {source}")]
    ReadArtifact {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// E004: A seed value expression failed to render
    #[error(
        "[E004] Seed processing stopped at file {file_index} ({file}), table '{table}', row {row}, column '{column}': {source}"
    )]
    Template {
        file: String,
        file_index: usize,
        table: String,
        row: usize,
        column: String,
        #[source]
        source: TemplateError,
    },

    /// E005: An insert, truncate or drop statement failed
    #[error("[E005] {context}: {source}")]
    SqlExecution {
        context: String,
        #[source]
        source: DbError,
    },

    /// E006: A seed file is not valid
    #[error("[E006] Seed processing stopped at file {file_index} ({file}): {source}")]
    SeedParse {
        file: String,
        file_index: usize,
        #[source]
        source: CoreError,
    },

    /// E007: A database name is not a plain identifier
    #[error("[E007] Invalid database name '{0}': use letters, digits and underscores")]
    InvalidDatabaseName(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;
