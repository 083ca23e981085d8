//! Truncate command implementation

use anyhow::{Context, Result};
use mg_engine::truncate_tables;

use crate::cli::GlobalArgs;
use crate::commands::common::{
    confirm_by_typing, connect, print_banner, print_done, NO_FURTHER_ACTION,
};

/// Word the operator must type before anything is truncated
const CONFIRMATION_WORD: &str = "destroy";

/// Execute the truncate command
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let target = connect(global).await?;

    print_banner("This will destroy all data");
    if !confirm_by_typing(global, CONFIRMATION_WORD)? {
        println!("{}", NO_FURTHER_ACTION);
        return Ok(());
    }

    let truncated = truncate_tables(target.db.as_ref())
        .await
        .context("Failed to truncate tables")?;

    print_done(&format!("Truncated {} table(s). All done", truncated));
    Ok(())
}
