//! Task record domain model.
//!
//! # Responsibility
//! - Define the canonical task record and the editable field set.
//! - Provide lifecycle helpers for soft-delete and restore semantics.
//!
//! # Invariants
//! - `id` is stable and never reused for another record.
//! - `sub_task` is never empty after validation.
//! - `end_date` is not earlier than `start_date` when both are set.
//! - `last_update` strictly increases on every lifecycle mutation.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Status literal that marks a record as finished.
pub const COMPLETED_STATUS: &str = "Completed";
/// Priority assigned to new records when the caller does not choose one.
pub const DEFAULT_PRIORITY: &str = "Medium";
/// Status assigned to new records when the caller does not choose one.
pub const DEFAULT_STATUS: &str = "Not Started";

/// Opaque, globally unique record identifier.
///
/// Fresh ids are UUID v4 text, but any non-empty string loaded from storage
/// is accepted so older files keep their identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = TaskValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TaskValidationError::EmptyId);
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Validation failures for task records and submitted field sets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskValidationError {
    #[error("sub_task cannot be empty")]
    EmptySubTask,
    #[error("end_date ({end}) must be >= start_date ({start})")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("task id cannot be empty")]
    EmptyId,
}

/// Editable field set submitted by create and edit flows.
///
/// Everything except identity and lifecycle bookkeeping lives here, so an
/// edit is always a full replacement of these fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    pub sub_task: String,
    pub main_task: String,
    pub priority: String,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub responsible: String,
    pub notes: String,
}

impl Default for TaskFields {
    fn default() -> Self {
        Self {
            sub_task: String::new(),
            main_task: String::new(),
            priority: DEFAULT_PRIORITY.to_string(),
            status: DEFAULT_STATUS.to_string(),
            start_date: None,
            end_date: None,
            responsible: String::new(),
            notes: String::new(),
        }
    }
}

impl TaskFields {
    /// Creates a field set with the given sub task and default values.
    pub fn new(sub_task: impl Into<String>) -> Self {
        Self {
            sub_task: sub_task.into(),
            ..Self::default()
        }
    }

    /// Checks the record-level invariants.
    ///
    /// Registry membership of `status`/`priority`/... is not checked here; see
    /// `ParameterSet::check_fields`.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.sub_task.trim().is_empty() {
            return Err(TaskValidationError::EmptySubTask);
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(TaskValidationError::InvalidDateRange { start, end });
            }
        }
        Ok(())
    }
}

/// Canonical persisted task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub sub_task: String,
    pub main_task: String,
    pub priority: String,
    pub status: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub responsible: String,
    pub notes: String,
    /// Refreshed on every mutation; doubles as the optimistic version token.
    #[serde(alias = "status_update_time", deserialize_with = "deserialize_timestamp")]
    pub last_update: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl TaskRecord {
    /// Builds a new active record with a generated id.
    ///
    /// # Errors
    /// - Returns a validation error when `fields` violate record invariants.
    pub fn create(fields: TaskFields, now: DateTime<Utc>) -> Result<Self, TaskValidationError> {
        Self::with_id(TaskId::generate(), fields, now)
    }

    /// Builds a new active record with a caller-provided id.
    ///
    /// Used by import paths where identity already exists.
    pub fn with_id(
        id: TaskId,
        fields: TaskFields,
        now: DateTime<Utc>,
    ) -> Result<Self, TaskValidationError> {
        if id.is_empty() {
            return Err(TaskValidationError::EmptyId);
        }
        fields.validate()?;
        Ok(Self {
            id,
            sub_task: fields.sub_task,
            main_task: fields.main_task,
            priority: fields.priority,
            status: fields.status,
            start_date: fields.start_date,
            end_date: fields.end_date,
            responsible: fields.responsible,
            notes: fields.notes,
            last_update: now,
            is_deleted: false,
        })
    }

    /// Returns a copy of the editable fields, e.g. to pre-fill an edit.
    pub fn fields(&self) -> TaskFields {
        TaskFields {
            sub_task: self.sub_task.clone(),
            main_task: self.main_task.clone(),
            priority: self.priority.clone(),
            status: self.status.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            responsible: self.responsible.clone(),
            notes: self.notes.clone(),
        }
    }

    /// Replaces every editable field and clears the tombstone.
    ///
    /// # Errors
    /// - Returns a validation error and leaves `self` untouched when `fields`
    ///   violate record invariants.
    pub fn apply(
        &mut self,
        fields: TaskFields,
        now: DateTime<Utc>,
    ) -> Result<(), TaskValidationError> {
        fields.validate()?;
        self.sub_task = fields.sub_task;
        self.main_task = fields.main_task;
        self.priority = fields.priority;
        self.status = fields.status;
        self.start_date = fields.start_date;
        self.end_date = fields.end_date;
        self.responsible = fields.responsible;
        self.notes = fields.notes;
        self.is_deleted = false;
        self.touch(now);
        Ok(())
    }

    /// Marks this record as softly deleted.
    pub fn soft_delete(&mut self, now: DateTime<Utc>) {
        self.is_deleted = true;
        self.touch(now);
    }

    /// Clears the soft delete flag.
    pub fn restore(&mut self, now: DateTime<Utc>) {
        self.is_deleted = false;
        self.touch(now);
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    pub fn is_completed(&self) -> bool {
        self.status == COMPLETED_STATUS
    }

    /// Days from `today` until `end_date`; negative when overdue.
    pub fn days_until_due(&self, today: NaiveDate) -> Option<i64> {
        self.end_date.map(|end| (end - today).num_days())
    }

    /// Checks invariants of a record read back from storage.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id.is_empty() {
            return Err(TaskValidationError::EmptyId);
        }
        self.fields().validate()
    }

    // Keeps `last_update` strictly monotonic even when the clock stalls.
    fn touch(&mut self, now: DateTime<Utc>) {
        let floor = self.last_update + Duration::microseconds(1);
        self.last_update = if now >= floor { now } else { floor };
    }
}

/// Parses a persisted timestamp.
///
/// Accepts RFC 3339 with any offset, and offset-less ISO-8601 values from
/// older files, which are read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    trimmed
        .parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(|err| format!("invalid timestamp `{trimmed}`: {err}"))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}
