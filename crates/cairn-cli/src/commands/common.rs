//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use cairn_core::config::MEMORY_DB_PATH;
use cairn_core::Config;
use cairn_db::DuckDbBackend;
use cairn_migrate::EngineError;
use std::fmt;
use std::path::Path;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors (such as the run lock guard) run first.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Intentionally empty: the command has already reported the problem.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Load the project config and apply command-line overrides.
///
/// The returned config has `migrations_dir` and `database.path` resolved
/// against the project directory.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    let root = Path::new(&global.project_dir);
    let mut config = match &global.config {
        Some(path) => Config::load(Path::new(path))
            .with_context(|| format!("Failed to load config file {path}"))?,
        None => Config::load_or_default(root).context("Failed to load cairn config")?,
    };

    if let Some(dir) = &global.migrations_dir {
        config.migrations_dir = dir.clone();
    }
    if let Some(target) = &global.target {
        config.database.path = target.clone();
    }
    config.validate().context("Invalid configuration")?;

    config.migrations_dir = config.migrations_dir_absolute(root).display().to_string();
    config.database.path = config.database_path_absolute(root);

    if global.verbose {
        eprintln!(
            "[verbose] migrations: {}, database: {}",
            config.migrations_dir, config.database.path
        );
    }
    Ok(config)
}

/// Open the configured database, creating the file if needed.
pub(crate) fn open_database(config: &Config) -> Result<DuckDbBackend> {
    DuckDbBackend::new(&config.database.path)
        .with_context(|| format!("Failed to open database {}", config.database.path))
}

/// Open the configured database for read-only commands.
///
/// A database file that does not exist yet has nothing applied, so an empty
/// in-memory database stands in for it rather than creating the file.
pub(crate) fn open_database_for_read(config: &Config) -> Result<DuckDbBackend> {
    let path = &config.database.path;
    if path != MEMORY_DB_PATH && !Path::new(path).exists() {
        log::debug!("Database {path} does not exist yet; treating the log as empty");
        return DuckDbBackend::in_memory().context("Failed to open in-memory database");
    }
    open_database(config)
}

/// Report an engine failure: integrity problems print a single message and
/// exit 1, everything else keeps its cause chain.
pub(crate) fn engine_failure(err: EngineError, action: &str) -> anyhow::Error {
    if err.is_integrity() {
        eprintln!("{err}");
        ExitCode(1).into()
    } else {
        anyhow::Error::new(err).context(action.to_string())
    }
}
