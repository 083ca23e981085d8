//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use console::style;
use inquire::{Confirm, InquireError, Text};
use mg_core::{Config, DatabaseConfig, SecretStore};
use mg_db::Database;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::GlobalArgs;

/// Printed whenever the operator declines a prompt
pub(crate) const NO_FURTHER_ACTION: &str = "No further actions will take place.";

/// A connected database together with the config it came from
pub(crate) struct Target {
    pub(crate) config: Config,
    pub(crate) database: DatabaseConfig,
    pub(crate) db: Arc<dyn Database>,
}

impl Target {
    /// Migration directory of the selected database
    pub(crate) fn migrations_dir(&self) -> Result<PathBuf> {
        self.config
            .migrations_dir(&self.database)
            .context("Failed to locate migrations directory")
    }
}

/// Load the config named by `--config`
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    Config::discover(Path::new(&global.config)).context("Failed to load config")
}

/// Load config, resolve secrets and open the database selected by `--database`
pub(crate) async fn connect(global: &GlobalArgs) -> Result<Target> {
    let config = load_config(global)?;
    let secrets = SecretStore::load(&config)
        .await
        .context("Failed to load secrets")?;
    let database = config
        .find_database(&global.database)?
        .resolved(&secrets)
        .context("Failed to resolve database uri")?;

    let db = mg_db::connect(&database)
        .await
        .with_context(|| format!("Failed to connect to database '{}'", database.name))?;
    log::debug!("Connected to {} ({})", database.name, db.db_type());

    Ok(Target {
        config,
        database,
        db,
    })
}

/// Ask a Y/n question; `--yes` answers for the operator
pub(crate) fn confirm(global: &GlobalArgs, message: &str) -> Result<bool> {
    if global.yes {
        return Ok(true);
    }
    match Confirm::new(message).with_default(false).prompt() {
        Ok(answer) => Ok(answer),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
        Err(e) => Err(e).context("Failed to read confirmation"),
    }
}

/// Require the operator to type `word` exactly
pub(crate) fn confirm_by_typing(global: &GlobalArgs, word: &str) -> Result<bool> {
    if global.yes {
        return Ok(true);
    }
    let prompt = format!("To confirm please type [{}] without brackets:", word);
    match Text::new(&prompt).prompt() {
        Ok(answer) => Ok(answer.trim() == word),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
        Err(e) => Err(e).context("Failed to read confirmation"),
    }
}

/// Print a warning inside a box of asterisks
pub(crate) fn print_banner(text: &str) {
    let rule = "*".repeat(text.chars().count() + 4);
    println!("{}", style(&rule).red());
    println!("{}", style(format!("* {} *", text)).red());
    println!("{}", style(&rule).red());
}

pub(crate) fn print_done(text: &str) {
    println!("{}", style(text).green());
}
