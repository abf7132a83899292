//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// Cairn - forward-only schema and data migrations from YAML files
#[derive(Parser, Debug)]
#[command(name = "cairn")]
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

    /// Override database path (relative paths resolve against the project directory)
    #[arg(short, long, global = true, env = "CAIRN_DATABASE")]
    pub target: Option<String>,

    /// Override migrations directory (relative paths resolve against the project directory)
    #[arg(short, long, global = true, env = "CAIRN_MIGRATIONS_DIR")]
    pub migrations_dir: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations
    Migrate(MigrateArgs),

    /// Show applied and pending migrations
    Status(StatusArgs),

    /// Check migration files and the log without applying anything
    Validate(ValidateArgs),

    /// Create the next numbered migration file
    New(NewArgs),
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Clear a run lock left behind by an interrupted run before migrating
    #[arg(long)]
    pub force_unlock: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Also print the recorded checksum of applied migrations
    #[arg(long)]
    pub checksums: bool,
}

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Only check that migration files load; skip comparing against the log
    #[arg(long)]
    pub files_only: bool,
}

/// Arguments for the new command
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Migration name, e.g. `create_users`
    pub name: String,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
