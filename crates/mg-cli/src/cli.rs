//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};
use mg_core::DEFAULT_DATABASE;
use std::path::PathBuf;

/// Migrant - timestamped SQL migrations and templated seed data
#[derive(Parser, Debug)]
#[command(name = "migrant")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file; looked up in /etc/migrant when missing here
    #[arg(short, long, global = true, default_value = "./config.yml")]
    pub config: String,

    /// Database to target, or the one marked `default: true`
    #[arg(short, long, global = true, default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Answer yes to every confirmation prompt
    #[arg(short, long, global = true)]
    pub yes: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a new, empty migration file
    Gen(GenArgs),

    /// Apply pending migrations to the database
    Up,

    /// Truncate all tables and load seed data
    Seed(SeedArgs),

    /// Drop all tables and reapply every migration
    Reset,

    /// Truncate all tables in the database
    Truncate,
}

/// Arguments for the gen command
#[derive(Args, Debug)]
pub struct GenArgs {
    /// Migration description; words are joined with spaces
    #[arg(required = true, num_args = 1..)]
    pub description: Vec<String>,
}

/// Arguments for the seed command
#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Seed files to apply in order (default: every YAML file in the seeds directory)
    pub files: Vec<PathBuf>,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
