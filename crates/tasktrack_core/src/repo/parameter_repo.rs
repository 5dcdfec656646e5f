//! Parameter repository contracts with JSON file and SQLite implementations.
//!
//! # Responsibility
//! - Load and store the controlled vocabulary as one unit.
//!
//! # Invariants
//! - `load_parameters` distinguishes "never saved" (`None`) from an empty set.
//! - `save_parameters` replaces every category atomically.

use crate::model::parameter::{ParameterCategory, ParameterSet};
use crate::repo::file;
use crate::repo::task_repo::{RepoError, RepoResult};
use chrono::{SecondsFormat, Utc};
use log::warn;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of the parameter document inside a data directory.
pub const PARAMETERS_FILE_NAME: &str = "parameters.json";

/// Whole-set persistence contract for the parameter registry.
pub trait ParameterRepository {
    fn backend_name(&self) -> &'static str;
    /// Returns `None` when nothing was ever saved.
    fn load_parameters(&self) -> RepoResult<Option<ParameterSet>>;
    fn save_parameters(&self, parameters: &ParameterSet) -> RepoResult<()>;
}

impl<T: ParameterRepository + ?Sized> ParameterRepository for Box<T> {
    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }

    fn load_parameters(&self) -> RepoResult<Option<ParameterSet>> {
        (**self).load_parameters()
    }

    fn save_parameters(&self, parameters: &ParameterSet) -> RepoResult<()> {
        (**self).save_parameters(parameters)
    }
}

/// Parameter repository backed by a JSON mapping of category to values.
#[derive(Debug, Clone)]
pub struct JsonParameterRepository {
    path: PathBuf,
}

impl JsonParameterRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `<dir>/parameters.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(PARAMETERS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ParameterRepository for JsonParameterRepository {
    fn backend_name(&self) -> &'static str {
        "json"
    }

    fn load_parameters(&self) -> RepoResult<Option<ParameterSet>> {
        let loaded = file::read_json::<ParameterSet>(&self.path);
        if let Err(err @ RepoError::Json { .. }) = &loaded {
            warn!(
                "event=parameters_load module=repo status=warn backend=json reason=corrupt error={}",
                err
            );
            file::quarantine(&self.path);
        }
        loaded
    }

    fn save_parameters(&self, parameters: &ParameterSet) -> RepoResult<()> {
        file::write_json_atomic(&self.path, parameters)
    }
}

/// SQLite-backed parameter repository.
pub struct SqliteParameterRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteParameterRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ParameterRepository for SqliteParameterRepository<'_> {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn load_parameters(&self) -> RepoResult<Option<ParameterSet>> {
        let saved: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM parameter_state WHERE id = 1;",
            [],
            |row| row.get(0),
        )?;
        if saved == 0 {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(
            "SELECT category, value
             FROM parameters
             ORDER BY category ASC, position ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut raw: BTreeMap<ParameterCategory, Vec<String>> = BTreeMap::new();

        while let Some(row) = rows.next()? {
            let category_text: String = row.get("category")?;
            let category = category_text
                .parse::<ParameterCategory>()
                .map_err(RepoError::InvalidData)?;
            raw.entry(category).or_default().push(row.get("value")?);
        }

        ParameterSet::try_from(raw)
            .map(Some)
            .map_err(|err| RepoError::InvalidData(err.to_string()))
    }

    fn save_parameters(&self, parameters: &ParameterSet) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM parameters;", [])?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO parameters (category, position, value) VALUES (?1, ?2, ?3);",
            )?;
            for category in ParameterCategory::ALL {
                for (position, value) in parameters.values(category).iter().enumerate() {
                    insert.execute(params![category.as_str(), position as i64, value.as_str()])?;
                }
            }
        }

        tx.execute(
            "INSERT INTO parameter_state (id, saved_at) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET saved_at = excluded.saved_at;",
            [Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)],
        )?;
        tx.commit()?;
        Ok(())
    }
}
