//! Reset command implementation

use anyhow::{Context, Result};
use mg_engine::reset_database;

use crate::cli::GlobalArgs;
use crate::commands::common::{confirm, connect, print_banner, print_done, NO_FURTHER_ACTION};

/// Execute the reset command
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let target = connect(global).await?;
    let dir = target.migrations_dir()?;

    print_banner("This will destroy all data and re-apply all migrations");
    if !confirm(global, "Please confirm")? {
        println!("{}", NO_FURTHER_ACTION);
        return Ok(());
    }

    let summary = reset_database(target.db.as_ref(), &dir)
        .await
        .context("Was not able to reset the database - it is probably in a dire state")?;

    print_done(&format!(
        "Reapplied {} migration(s). All done",
        summary.applied.len()
    ));
    Ok(())
}
