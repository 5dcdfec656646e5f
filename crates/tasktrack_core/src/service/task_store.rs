//! Task store: the session's authoritative record collection.
//!
//! # Responsibility
//! - Own the in-memory task collection for the session lifetime.
//! - Apply lifecycle mutations and write the whole collection through.
//!
//! # Invariants
//! - The collection is loaded once by `open` and written through after every
//!   successful mutation; there is no dirty tracking.
//! - Validation and `NotFound` failures happen before any state change.
//! - A failed write keeps the in-memory mutation and reports `StorageWrite`.
//! - Ids are unique across active and soft-deleted records.

use crate::model::task::{TaskFields, TaskId, TaskRecord, TaskValidationError};
use crate::repo::task_repo::{RepoError, TaskRepository};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::time::Instant;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by task store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] TaskValidationError),
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("task {id} was modified since it was read (expected last_update {expected}, stored {actual})")]
    Conflict {
        id: TaskId,
        expected: DateTime<Utc>,
        actual: DateTime<Utc>,
    },
    #[error("could not read task storage, continuing with an empty collection: {0}")]
    StorageRead(#[source] RepoError),
    #[error("could not write task storage, the change may not survive a restart: {source}")]
    StorageWrite {
        task_id: Option<TaskId>,
        #[source]
        source: RepoError,
    },
}

impl StoreError {
    /// Storage failures leave the store usable and are reported as warnings.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::StorageRead(_) | Self::StorageWrite { .. })
    }
}

/// Write-through owner of the task collection.
pub struct TaskStore<R: TaskRepository> {
    repo: R,
    tasks: Vec<TaskRecord>,
    load_warning: Option<StoreError>,
}

impl<R: TaskRepository> TaskStore<R> {
    /// Creates a store and loads the collection once.
    ///
    /// A read failure does not fail construction: the store starts empty and
    /// the error is kept in `load_warning()`.
    pub fn open(repo: R) -> Self {
        let mut store = Self {
            repo,
            tasks: Vec::new(),
            load_warning: None,
        };
        store.load_warning = store.load().err();
        store
    }

    /// Reloads the full collection (active and deleted) from storage.
    ///
    /// # Errors
    /// - `StorageRead` when storage is unreadable; the in-memory collection is
    ///   replaced by an empty one and the store stays usable.
    pub fn load(&mut self) -> StoreResult<&[TaskRecord]> {
        let started_at = Instant::now();
        match self.repo.load_tasks() {
            Ok(tasks) => {
                info!(
                    "event=tasks_load module=store status=ok backend={} count={} duration_ms={}",
                    self.repo.backend_name(),
                    tasks.len(),
                    started_at.elapsed().as_millis()
                );
                self.tasks = tasks;
                Ok(&self.tasks)
            }
            Err(err) => {
                warn!(
                    "event=tasks_load module=store status=warn backend={} fallback=empty error={}",
                    self.repo.backend_name(),
                    err
                );
                self.tasks.clear();
                Err(StoreError::StorageRead(err))
            }
        }
    }

    /// Writes the whole in-memory collection to storage.
    pub fn persist(&self) -> StoreResult<()> {
        self.repo
            .save_tasks(&self.tasks)
            .map_err(|source| StoreError::StorageWrite {
                task_id: None,
                source,
            })
    }

    pub fn load_warning(&self) -> Option<&StoreError> {
        self.load_warning.as_ref()
    }

    pub fn take_load_warning(&mut self) -> Option<StoreError> {
        self.load_warning.take()
    }

    /// Every record in insertion order.
    pub fn records(&self) -> &[TaskRecord] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&TaskRecord> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    /// Records that are not soft-deleted.
    pub fn active(&self) -> Vec<TaskRecord> {
        self.tasks.iter().filter(|task| task.is_active()).cloned().collect()
    }

    /// Soft-deleted records.
    pub fn deleted(&self) -> Vec<TaskRecord> {
        self.tasks.iter().filter(|task| task.is_deleted).cloned().collect()
    }

    /// Creates a record and returns its fresh id.
    ///
    /// # Errors
    /// - `Validation` for an empty `sub_task` or reversed dates; nothing changes.
    /// - `StorageWrite` when the write fails; the record stays in memory and
    ///   the error carries its id.
    pub fn add(&mut self, fields: TaskFields) -> StoreResult<TaskId> {
        let mut record = TaskRecord::create(fields, Utc::now())?;
        while self.position(&record.id).is_some() {
            record.id = TaskId::generate();
        }

        let id = record.id.clone();
        self.tasks.push(record);
        self.write_through("task_add", &id)?;
        Ok(id)
    }

    /// Replaces every editable field of a record and clears its tombstone.
    ///
    /// Last writer wins; use `update_checked` to detect concurrent edits.
    pub fn update(&mut self, id: &TaskId, fields: TaskFields) -> StoreResult<()> {
        fields.validate()?;
        let index = self.require(id)?;
        self.tasks[index].apply(fields, Utc::now())?;
        self.write_through("task_update", id)
    }

    /// Updates a record only if it is unchanged in storage since it was read.
    ///
    /// `expected` is the `last_update` the caller saw when it started
    /// editing. Storage is read for the token comparison only: the edit is
    /// applied to the cached record and every other cached record, saved or
    /// not, is kept. A record present in storage but missing from the cache is
    /// adopted before the edit.
    ///
    /// # Errors
    /// - `Conflict` when the stored `last_update` differs from `expected`.
    /// - `StorageRead` when storage cannot be read for the comparison.
    pub fn update_checked(
        &mut self,
        id: &TaskId,
        expected: DateTime<Utc>,
        fields: TaskFields,
    ) -> StoreResult<()> {
        fields.validate()?;
        let stored = self
            .repo
            .load_tasks()
            .map_err(StoreError::StorageRead)?
            .into_iter()
            .find(|task| &task.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let actual = stored.last_update;

        if actual != expected {
            warn!(
                "event=task_update module=store status=conflict id={}",
                id
            );
            return Err(StoreError::Conflict {
                id: id.clone(),
                expected,
                actual,
            });
        }

        match self.position(id) {
            Some(index) => {
                let cached = &mut self.tasks[index];
                cached.last_update = cached.last_update.max(actual);
            }
            None => self.tasks.push(stored),
        }
        self.update(id, fields)
    }

    pub fn soft_delete(&mut self, id: &TaskId) -> StoreResult<()> {
        let index = self.require(id)?;
        self.tasks[index].soft_delete(Utc::now());
        self.write_through("task_soft_delete", id)
    }

    /// Clears the tombstone. Restoring an active record only refreshes
    /// `last_update`.
    pub fn restore(&mut self, id: &TaskId) -> StoreResult<()> {
        let index = self.require(id)?;
        self.tasks[index].restore(Utc::now());
        self.write_through("task_restore", id)
    }

    /// Permanently removes a record. Irreversible.
    pub fn hard_delete(&mut self, id: &TaskId) -> StoreResult<()> {
        let index = self.require(id)?;
        self.tasks.remove(index);
        self.write_through("task_hard_delete", id)
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| &task.id == id)
    }

    fn require(&self, id: &TaskId) -> StoreResult<usize> {
        self.position(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn write_through(&self, event: &str, id: &TaskId) -> StoreResult<()> {
        let started_at = Instant::now();
        match self.repo.save_tasks(&self.tasks) {
            Ok(()) => {
                info!(
                    "event={} module=store status=ok backend={} id={} count={} duration_ms={}",
                    event,
                    self.repo.backend_name(),
                    id,
                    self.tasks.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(source) => {
                warn!(
                    "event={} module=store status=warn backend={} id={} persisted=false error={}",
                    event,
                    self.repo.backend_name(),
                    id,
                    source
                );
                Err(StoreError::StorageWrite {
                    task_id: Some(id.clone()),
                    source,
                })
            }
        }
    }
}
