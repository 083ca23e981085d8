//! mg-core - Core library for Migrant
//!
//! This crate provides the configuration model, secret resolution, migration
//! discovery and reconciliation, and seed file parsing shared by the engine
//! and the CLI. Nothing here talks to a database.

pub mod config;
pub mod error;
pub mod migration;
pub mod secrets;
pub mod seed;

pub use config::{Config, DatabaseConfig, DbType, DEFAULT_DATABASE};
pub use error::{CoreError, CoreResult};
pub use migration::{
    generate_migration, reconcile, scan_migrations, LedgerEntry, MigrationRecord,
};
pub use secrets::SecretStore;
pub use seed::{discover_seed_files, SeedGroup, SeedRow, SeedSpec};
