//! Gen command implementation

use anyhow::{Context, Result};
use chrono::Local;
use mg_core::generate_migration;

use crate::cli::{GenArgs, GlobalArgs};
use crate::commands::common::{load_config, print_done};

/// Execute the gen command
pub async fn execute(args: &GenArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let database = config.find_database(&global.database)?;
    let dir = config
        .migrations_dir(&database)
        .context("Failed to locate migrations directory")?;

    let description = args.description.join(" ");
    let path = generate_migration(&dir, &description, Local::now().naive_local())
        .context("Error generating migration")?;

    print_done(&format!("Generated migration {}", path.display()));
    Ok(())
}
