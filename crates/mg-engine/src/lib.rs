//! mg-engine - Migration and seed engine for Migrant
//!
//! Everything here runs strictly sequentially against one shared
//! [`Database`](mg_db::Database) handle. No function opens a second
//! connection or starts a transaction of its own.

pub mod error;
pub mod ledger;
pub mod migrate;
pub mod reset;
pub mod seed;

pub use error::{EngineError, EngineResult};
pub use ledger::{
    init_ledger_table, read_ledger, record_applied, stat, CatalogLookup, DatabaseStat,
    LedgerPresence, TrialRead, LEDGER_TABLE,
};
pub use migrate::{apply_migrations, check_migrations, ApplySummary};
pub use reset::{create_database, drop_all_tables, reset_database, truncate_tables};
pub use seed::{apply_seeds, seed_database, SeedSummary};
