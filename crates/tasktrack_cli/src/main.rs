//! `tasktrack` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration, data directory and backend.
//! - Start logging, open both stores and dispatch one command.
//!
//! # Invariants
//! - Flags override `TASKTRACK_DATA_DIR`, which overrides the config file.
//! - Storage load warnings go to stderr; they never abort the command.

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Command, Session};
use log::info;
use output::OutputMode;
use std::path::{Path, PathBuf};
use tasktrack_core::config::SQLITE_FILE_NAME;
use tasktrack_core::{
    db, init_logging, load_config, JsonParameterRepository, JsonTaskRepository,
    ParameterRepository, ParameterStore, SqliteParameterRepository, SqliteTaskRepository,
    StorageBackend, TaskRepository, TaskStore,
};

type DynTaskRepo<'a> = Box<dyn TaskRepository + 'a>;
type DynParameterRepo<'a> = Box<dyn ParameterRepository + 'a>;

#[derive(Parser, Debug)]
#[command(author, version, about = "tasktrack: a small task tracker", long_about = None)]
struct Cli {
    /// Emit JSON instead of plain text.
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: <config dir>/tasktrack/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory holding tasks and parameters.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Storage backend: json or sqlite.
    #[arg(long, global = true)]
    backend: Option<StorageBackend>,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;

    let data_dir = absolute(&cli.data_dir.clone().unwrap_or_else(|| config.data_dir()))?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let log_dir = absolute(&config.log_dir(&data_dir))?;
    if let Err(err) = init_logging(config.log_level(), &log_dir) {
        output::warning(&format!("file logging disabled: {err}"));
    }

    let backend = cli.backend.unwrap_or(config.storage.backend);
    info!(
        "event=cli_start module=cli status=ok backend={} command={}",
        backend,
        cli.command.name()
    );

    let conn;
    let (task_repo, parameter_repo): (DynTaskRepo<'_>, DynParameterRepo<'_>) = match backend {
        StorageBackend::Json => (
            Box::new(JsonTaskRepository::in_dir(&data_dir)),
            Box::new(JsonParameterRepository::in_dir(&data_dir)),
        ),
        StorageBackend::Sqlite => {
            conn = db::open_db(data_dir.join(SQLITE_FILE_NAME))
                .context("failed to open task database")?;
            (
                Box::new(SqliteTaskRepository::new(&conn)),
                Box::new(SqliteParameterRepository::new(&conn)),
            )
        }
    };

    let tasks = TaskStore::open(task_repo);
    if let Some(warning) = tasks.load_warning() {
        output::warning(warning);
    }
    let parameters = ParameterStore::open(parameter_repo);
    if let Some(warning) = parameters.load_warning() {
        output::warning(warning);
    }

    let mut session = Session {
        tasks,
        parameters,
        config: &config,
        mode: OutputMode::from_json_flag(cli.json),
    };
    commands::run(cli.command, &mut session)
}

// Logging requires an absolute directory.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    Ok(cwd.join(path))
}
