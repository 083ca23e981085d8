//! Up command implementation

use anyhow::{bail, Context, Result};
use console::style;
use mg_core::migration::{longest_description, pending};
use mg_core::MigrationRecord;
use mg_engine::{apply_migrations, check_migrations, init_ledger_table, stat, TrialRead};

use crate::cli::GlobalArgs;
use crate::commands::common::{confirm, connect, print_done, NO_FURTHER_ACTION};

/// Space between the longest description and the status column
const INDENT: usize = 10;

/// Execute the up command
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let target = connect(global).await?;
    let db = target.db.as_ref();

    if !stat(db, &TrialRead).await?.has_ledger_table {
        let create = confirm(
            global,
            "There is no migration table. Do you want to create one? (This will alter your database)",
        )?;
        if !create {
            bail!("Cannot run migrations without a migration table. {}", NO_FURTHER_ACTION);
        }
        init_ledger_table(db, &TrialRead).await?;
    }

    let dir = target.migrations_dir()?;
    let records = check_migrations(db, &dir)
        .await
        .with_context(|| format!("Failed to check migrations in {}", dir.display()))?;

    let width = longest_description(&records) + INDENT;
    for record in &records {
        let line = format_record(record, width);
        if record.applied {
            println!("{}", style(line).green());
        } else {
            println!("{}", style(line).red());
        }
    }

    let will_apply = pending(&records).len();
    if will_apply == 0 {
        println!("No migrations to apply. All done");
        return Ok(());
    }

    println!("Will apply {} migration(s)", will_apply);
    if !confirm(global, "Apply pending migrations?")? {
        println!("{}", NO_FURTHER_ACTION);
        return Ok(());
    }

    let summary = apply_migrations(db, &records)
        .await
        .context("Was not able to apply migrations")?;

    print_done(&format!(
        "Applied {} migration(s). All done",
        summary.applied.len()
    ));
    Ok(())
}

/// `<prefix> <description padded to width> [APPLIED]|[NOT APPLIED]`
fn format_record(record: &MigrationRecord, width: usize) -> String {
    let status = if record.applied {
        "[APPLIED]"
    } else {
        "[NOT APPLIED]"
    };
    format!(
        "{} {:<width$} {}",
        record.prefix,
        record.description,
        status,
        width = width
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(prefix: &str, description: &str, applied: bool) -> MigrationRecord {
        MigrationRecord {
            prefix: prefix.to_string(),
            description: description.to_string(),
            path: format!("{}_{}.sql", prefix, description.replace(' ', "_")).into(),
            applied,
        }
    }

    #[test]
    fn test_format_record_aligns_status() {
        let records = vec![
            record("20190101001122", "test 1", true),
            record("20190102001122", "a longer one", false),
        ];
        let width = longest_description(&records) + INDENT;

        let first = format_record(&records[0], width);
        let second = format_record(&records[1], width);

        assert_eq!(first, format!("20190101001122 test 1{} [APPLIED]", " ".repeat(16)));
        assert!(second.ends_with("a longer one           [NOT APPLIED]"));
        assert_eq!(first.find('['), second.find('['));
    }
}
