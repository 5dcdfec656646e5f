//! Task repository contracts with JSON file and SQLite implementations.
//!
//! # Responsibility
//! - Load and store the complete task collection as one unit.
//! - Keep file and SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `save_tasks` replaces the whole collection atomically.
//! - Collection order is preserved across a save/load round trip.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::task::{parse_timestamp, TaskId, TaskRecord};
use crate::repo::file;
use chrono::{NaiveDate, SecondsFormat};
use log::warn;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the task document inside a data directory.
pub const TASKS_FILE_NAME: &str = "tasks.json";

const TASK_SELECT_SQL: &str = "SELECT
    id,
    sub_task,
    main_task,
    priority,
    status,
    start_date,
    end_date,
    responsible,
    notes,
    last_update,
    is_deleted
FROM tasks
ORDER BY position ASC";

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage error shared by every repository backend.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("i/o error on `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON in `{}`: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Whole-collection persistence contract for task records.
pub trait TaskRepository {
    /// Short backend label used in log events.
    fn backend_name(&self) -> &'static str;
    /// Loads every record, active and deleted. Missing storage loads empty.
    fn load_tasks(&self) -> RepoResult<Vec<TaskRecord>>;
    /// Replaces the stored collection with `tasks`.
    fn save_tasks(&self, tasks: &[TaskRecord]) -> RepoResult<()>;
}

impl<T: TaskRepository + ?Sized> TaskRepository for Box<T> {
    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }

    fn load_tasks(&self) -> RepoResult<Vec<TaskRecord>> {
        (**self).load_tasks()
    }

    fn save_tasks(&self, tasks: &[TaskRecord]) -> RepoResult<()> {
        (**self).save_tasks(tasks)
    }
}

/// Checks per-record invariants and id uniqueness of a loaded collection.
pub fn check_collection(tasks: &[TaskRecord]) -> RepoResult<()> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        task.validate()
            .map_err(|err| RepoError::InvalidData(format!("task `{}`: {err}", task.id)))?;
        if !seen.insert(&task.id) {
            return Err(RepoError::InvalidData(format!(
                "duplicate task id `{}`",
                task.id
            )));
        }
    }
    Ok(())
}

/// Task repository backed by a single pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonTaskRepository {
    path: PathBuf,
}

impl JsonTaskRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `<dir>/tasks.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(TASKS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskRepository for JsonTaskRepository {
    fn backend_name(&self) -> &'static str {
        "json"
    }

    fn load_tasks(&self) -> RepoResult<Vec<TaskRecord>> {
        let loaded = file::read_json::<Vec<TaskRecord>>(&self.path)
            .and_then(|tasks| {
                let tasks = tasks.unwrap_or_default();
                check_collection(&tasks)?;
                Ok(tasks)
            });

        if let Err(err @ (RepoError::Json { .. } | RepoError::InvalidData(_))) = &loaded {
            warn!(
                "event=tasks_load module=repo status=warn backend=json reason=corrupt error={}",
                err
            );
            file::quarantine(&self.path);
        }
        loaded
    }

    fn save_tasks(&self, tasks: &[TaskRecord]) -> RepoResult<()> {
        file::write_json_atomic(&self.path, tasks)
    }
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Wraps a connection returned by `db::open_db*` (migrations applied).
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn load_tasks(&self) -> RepoResult<Vec<TaskRecord>> {
        let mut stmt = self.conn.prepare(TASK_SELECT_SQL)?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();

        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }

        check_collection(&tasks)?;
        Ok(tasks)
    }

    fn save_tasks(&self, tasks: &[TaskRecord]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM tasks;", [])?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO tasks (
                    id,
                    position,
                    sub_task,
                    main_task,
                    priority,
                    status,
                    start_date,
                    end_date,
                    responsible,
                    notes,
                    last_update,
                    is_deleted
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            )?;

            for (position, task) in tasks.iter().enumerate() {
                insert.execute(params![
                    task.id.as_str(),
                    position as i64,
                    task.sub_task.as_str(),
                    task.main_task.as_str(),
                    task.priority.as_str(),
                    task.status.as_str(),
                    task.start_date.map(date_to_db),
                    task.end_date.map(date_to_db),
                    task.responsible.as_str(),
                    task.notes.as_str(),
                    task.last_update.to_rfc3339_opts(SecondsFormat::Nanos, true),
                    bool_to_int(task.is_deleted),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<TaskRecord> {
    let id_text: String = row.get("id")?;
    let id = id_text
        .parse::<TaskId>()
        .map_err(|_| RepoError::InvalidData("empty id in tasks.id".to_string()))?;

    let last_update_text: String = row.get("last_update")?;
    let last_update = parse_timestamp(&last_update_text).map_err(RepoError::InvalidData)?;

    let is_deleted = match row.get::<_, i64>("is_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in tasks.is_deleted"
            )));
        }
    };

    Ok(TaskRecord {
        id,
        sub_task: row.get("sub_task")?,
        main_task: row.get("main_task")?,
        priority: row.get("priority")?,
        status: row.get("status")?,
        start_date: parse_date_column(row, "start_date")?,
        end_date: parse_date_column(row, "end_date")?,
        responsible: row.get("responsible")?,
        notes: row.get("notes")?,
        last_update,
        is_deleted,
    })
}

fn parse_date_column(row: &Row<'_>, column: &str) -> RepoResult<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(column)? {
        Some(text) => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                RepoError::InvalidData(format!("invalid date `{text}` in tasks.{column}"))
            }),
        None => Ok(None),
    }
}

fn date_to_db(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
