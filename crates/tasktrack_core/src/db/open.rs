//! Connection bootstrap for the SQLite task backend.
//!
//! # Responsibility
//! - Open the tracker database either from a file or in memory.
//! - Apply per-connection pragmas, then bring the schema up to date.
//!
//! # Invariants
//! - A connection handed out by this module is always at `latest_version()`.
//! - File databases use the WAL journal; in-memory ones keep SQLite's default.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{debug, error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target<'p> {
    File(&'p Path),
    Memory,
}

impl Target<'_> {
    fn label(self) -> &'static str {
        match self {
            Target::File(_) => "file",
            Target::Memory => "memory",
        }
    }
}

/// Opens (creating if needed) the database file at `path`.
///
/// Emits `db_open` events carrying the elapsed time and outcome.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_target(Target::File(path.as_ref()))
}

/// Opens a private in-memory database with the full schema applied.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_target(Target::Memory)
}

fn open_target(target: Target<'_>) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = target.label();

    let outcome = connect(target);
    let elapsed_ms = started_at.elapsed().as_millis();
    match &outcome {
        Ok(_) => info!("event=db_open module=db status=ok mode={mode} duration_ms={elapsed_ms}"),
        Err(err) => error!(
            "event=db_open module=db status=error mode={mode} duration_ms={elapsed_ms} error={err}"
        ),
    }
    outcome
}

fn connect(target: Target<'_>) -> DbResult<Connection> {
    let mut conn = match target {
        Target::File(path) => {
            let conn = Connection::open(path)?;
            let journal: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            debug!("event=db_pragma module=db journal_mode={journal}");
            conn
        }
        Target::Memory => Connection::open_in_memory()?,
    };
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}
