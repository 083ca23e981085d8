//! Error types for mg-core

use thiserror::Error;

/// Core error type for Migrant
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse a YAML document (config or seed file)
    #[error("[C002] Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C004: Named database missing from the `databases` block
    #[error("[C004] Database '{name}' not found in config. Available databases: {available}")]
    DatabaseNotFound { name: String, available: String },

    /// C005: No database is flagged `default: true`
    #[error("[C005] No default database configured. Mark one database with `default: true` or pass --database")]
    NoDefaultDatabase,

    /// C006: Secret reference could not be resolved
    #[error("[C006] Secret not found: {source_name} - {key}")]
    SecretNotFound { source_name: String, key: String },

    /// C007: A secret source could not be fetched or decoded
    #[error("[C007] Failed to load secret source '{name}': {message}")]
    SecretSourceFailed { name: String, message: String },

    /// C008: Migration source is not a directory
    #[error("[C008] Migration source is not a directory: {path}")]
    NotADirectory { path: String },

    /// C009: Artifact name or content violates the expected shape
    #[error("[C009] Malformed artifact '{path}': {reason}")]
    MalformedArtifact { path: String, reason: String },

    /// C010: Refusing to overwrite an existing migration file
    #[error("[C010] Migration file already exists: {path}")]
    MigrationExists { path: String },

    /// C011: IO error with file path context
    #[error("[C011] Failed to access '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C012: IO error
    #[error("[C012] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization error (secret files)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Wrap an IO error with the path that caused it
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        CoreError::IoWithPath {
            path: path.display().to_string(),
            source,
        }
    }
}
