//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use strata_migrate::RollbackStrategy;

/// Strata - apply, roll back, inspect, and repair schema migrations
#[derive(Parser, Debug)]
#[command(name = "strata")]
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

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Database path (`:memory:` for a throwaway database)
    #[arg(long, global = true, env = "STRATA_DATABASE")]
    pub database: Option<String>,

    /// Directory holding one sub-directory per migration
    #[arg(long, global = true, env = "STRATA_MIGRATIONS_DIR")]
    pub migrations_dir: Option<String>,

    /// Tracking table name, optionally schema-qualified
    #[arg(long, global = true, env = "STRATA_TRACKING_TABLE")]
    pub tracking_table: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations
    Migrate(MigrateArgs),

    /// Reverse applied migrations
    Rollback(RollbackArgs),

    /// Show the state of every migration
    Status(StatusArgs),

    /// Re-run a failed migration
    Retry(RetryArgs),

    /// Record a migration as completed without running it
    MarkCompleted(MarkCompletedArgs),

    /// Record every migration as completed without running them
    MarkAllCompleted(MarkAllCompletedArgs),

    /// Check applied migrations against their current definitions
    Validate,
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Skip failed and in-progress migrations instead of refusing to run
    #[arg(long)]
    pub force: bool,

    /// Show what would run without executing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Stop after applying this migration (inclusive)
    #[arg(long, value_name = "ID", conflicts_with = "steps")]
    pub to: Option<String>,

    /// Apply at most this many migrations
    #[arg(long, value_name = "N")]
    pub steps: Option<usize>,

    /// Fail instead of warning when an applied migration has changed
    #[arg(long)]
    pub strict_checksums: bool,
}

/// Arguments for the rollback command
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// last | down-to:ID | steps:N | all
    #[arg(long, default_value = "last")]
    pub strategy: RollbackStrategy,

    /// Show what would be reversed without executing anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only list failed and in-progress migrations, with their errors
    #[arg(long)]
    pub show_failed: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

/// Arguments for the retry command
#[derive(Args, Debug)]
pub struct RetryArgs {
    /// Migration id
    pub id: String,
}

/// Arguments for the mark-completed command
#[derive(Args, Debug)]
pub struct MarkCompletedArgs {
    /// Migration id
    pub id: String,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the mark-all-completed command
#[derive(Args, Debug)]
pub struct MarkAllCompletedArgs {
    /// Also mark failed migrations
    #[arg(long)]
    pub include_failed: bool,

    /// Also mark in-progress migrations
    #[arg(long)]
    pub include_in_progress: bool,

    /// Mark every migration regardless of state
    #[arg(long)]
    pub all: bool,

    /// Drop and recreate the tracking table first, discarding all history
    #[arg(long)]
    pub drop: bool,

    /// Tracking table name, repeated to approve --drop without a prompt
    #[arg(long, value_name = "TABLE", requires = "drop")]
    pub confirm_table: Option<String>,

    /// Skip the confirmation prompt (does not approve --drop)
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
