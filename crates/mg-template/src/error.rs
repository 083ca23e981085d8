//! Error types for mg-template

use thiserror::Error;

/// Seed templating errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// Template render error (T001)
    #[error("[T001] Template render error: {0}")]
    RenderError(String),

    /// Unknown variable (T002)
    #[error("[T002] Undefined variable '{name}'. Define it in the variables: section of the seed file")]
    UnknownVariable { name: String },

    /// No row has been inserted into the table yet (T003)
    #[error("[T003] No ids collected for table '{table}'. Rows must be inserted before they are referenced")]
    UnknownTable { table: String },

    /// Index past the rows inserted so far (T004)
    #[error("[T004] id(\"{table}\", {index}) is out of range: {available} row(s) inserted so far")]
    IndexOutOfRange {
        table: String,
        index: i64,
        available: usize,
    },

    /// The referenced row was inserted but the database generated no id (T005)
    #[error("[T005] Row {index} of table '{table}' has no generated id")]
    MissingGeneratedId { table: String, index: usize },
}

/// Result type alias for TemplateError
pub type TemplateResult<T> = Result<T, TemplateError>;

impl From<minijinja::Error> for TemplateError {
    fn from(err: minijinja::Error) -> Self {
        // id() and var() attach the precise failure as the error source.
        std::error::Error::source(&err)
            .and_then(|source| source.downcast_ref::<TemplateError>())
            .cloned()
            .unwrap_or_else(|| TemplateError::RenderError(err.to_string()))
    }
}
