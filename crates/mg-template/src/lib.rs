//! mg-template - Seed value templating for Migrant
//!
//! Every column value in a seed file is a template expression rendered
//! through a minimal environment that knows exactly two functions:
//! `id(table, index)` and `var(name)`.

pub mod collected;
pub mod environment;
pub mod error;
mod functions;
mod legacy;

pub use collected::CollectedIds;
pub use environment::SeedTemplates;
pub use error::{TemplateError, TemplateResult};
pub use legacy::rewrite_bare_calls;
