//! Command implementations

pub(crate) mod common;
pub mod gen;
pub mod reset;
pub mod seed;
pub mod truncate;
pub mod up;
