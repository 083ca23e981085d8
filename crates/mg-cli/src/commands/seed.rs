//! Seed command implementation

use anyhow::{Context, Result};
use mg_core::discover_seed_files;
use mg_engine::seed_database;
use std::path::PathBuf;

use crate::cli::{GlobalArgs, SeedArgs};
use crate::commands::common::{confirm, connect, print_banner, print_done, NO_FURTHER_ACTION};

/// Execute the seed command
pub async fn execute(args: &SeedArgs, global: &GlobalArgs) -> Result<()> {
    let target = connect(global).await?;
    let files = seed_files(args, &target.config.seeds_dir())?;

    print_banner("This will destroy all data and replace with seed data");
    if !confirm(global, "Please confirm")? {
        println!("{}", NO_FURTHER_ACTION);
        return Ok(());
    }

    let summary = seed_database(target.db.as_ref(), &files)
        .await
        .context("Seeding failed")?;

    print_done(&format!(
        "Seeded {} row(s) from {} file(s). All done",
        summary.rows, summary.files
    ));
    Ok(())
}

/// Files named on the command line, or every seed file in the seeds directory
fn seed_files(args: &SeedArgs, seeds_dir: &std::path::Path) -> Result<Vec<PathBuf>> {
    if args.files.is_empty() {
        return discover_seed_files(seeds_dir)
            .with_context(|| format!("Failed to find seed files in {}", seeds_dir.display()));
    }

    for file in &args.files {
        std::fs::metadata(file)
            .with_context(|| format!("Seed file not found: {}", file.display()))?;
    }
    Ok(args.files.clone())
}
