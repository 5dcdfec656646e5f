//! Ad-hoc filtering and canned date-window views.
//!
//! # Invariants
//! - Functions never mutate their input and return matches in input order.
//! - Omitted criteria are vacuously true; supplied criteria are AND-ed.
//! - A record missing a date needed by an active date criterion is excluded.
//! - Time is always passed in, never read from the clock here.

use crate::model::parameter::ParameterCategory;
use crate::model::task::TaskRecord;
use crate::query::predicate::{DateRange, TaskPredicate};
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};

/// Window used by the "recently completed" view.
pub const DEFAULT_RECENT_DAYS: u32 = 7;
/// Window used by the "upcoming" view.
pub const DEFAULT_UPCOMING_DAYS: u32 = 21;

/// Ad-hoc filter criteria. `None`, an empty string or an empty list means
/// "not filtered on this field".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub sub_task_contains: Option<String>,
    pub main_task_in: Option<Vec<String>>,
    pub priority_in: Option<Vec<String>>,
    pub status_in: Option<Vec<String>>,
    pub responsible_in: Option<Vec<String>>,
    pub start_range: Option<DateRange>,
    pub end_range: Option<DateRange>,
}

impl TaskFilter {
    /// Builds the conjunction of every supplied criterion.
    pub fn to_predicate(&self) -> TaskPredicate {
        let mut predicate = TaskPredicate::Always;

        if let Some(needle) = self.sub_task_contains.as_deref().filter(|s| !s.is_empty()) {
            predicate = predicate.and(TaskPredicate::SubTaskContains(needle.to_string()));
        }

        let memberships = [
            (ParameterCategory::MainTask, &self.main_task_in),
            (ParameterCategory::Priority, &self.priority_in),
            (ParameterCategory::Status, &self.status_in),
            (ParameterCategory::Responsible, &self.responsible_in),
        ];
        for (category, values) in memberships {
            if let Some(values) = values.as_ref().filter(|values| !values.is_empty()) {
                predicate = predicate.and(TaskPredicate::FieldIn(category, values.clone()));
            }
        }

        if let Some(range) = self.start_range {
            predicate = predicate.and(TaskPredicate::StartWithin(range));
        }
        if let Some(range) = self.end_range {
            predicate = predicate.and(TaskPredicate::EndWithin(range));
        }
        predicate
    }
}

/// Returns records matching `predicate`.
pub fn select(records: &[TaskRecord], predicate: &TaskPredicate) -> Vec<TaskRecord> {
    records
        .iter()
        .filter(|record| predicate.matches(record))
        .cloned()
        .collect()
}

/// Applies ad-hoc criteria; an empty filter returns the input unchanged.
pub fn filter(records: &[TaskRecord], criteria: &TaskFilter) -> Vec<TaskRecord> {
    select(records, &criteria.to_predicate())
}

pub fn recently_completed_predicate(days: u32, now: DateTime<Utc>) -> TaskPredicate {
    let cutoff = now
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    TaskPredicate::Completed.and(TaskPredicate::UpdatedSince(cutoff))
}

/// Completed records whose `last_update` is within the last `days` days.
pub fn recently_completed(
    records: &[TaskRecord],
    days: u32,
    now: DateTime<Utc>,
) -> Vec<TaskRecord> {
    select(records, &recently_completed_predicate(days, now))
}

pub fn upcoming_predicate(days: u32, today: NaiveDate) -> TaskPredicate {
    let horizon = today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX);
    TaskPredicate::Completed
        .negate()
        .and(TaskPredicate::EndWithin(DateRange::new(today, horizon)))
}

/// Unfinished records due between today and `today + days`, inclusive.
pub fn upcoming(records: &[TaskRecord], days: u32, today: NaiveDate) -> Vec<TaskRecord> {
    select(records, &upcoming_predicate(days, today))
}

/// Records starting or ending in the year of `today`.
pub fn current_year(records: &[TaskRecord], today: NaiveDate) -> Vec<TaskRecord> {
    select(records, &TaskPredicate::TouchesYear(today.year()))
}

/// Records starting in `[start, end]`, ending in it, or spanning it.
///
/// With `start > end` the first two clauses are empty but a record running
/// from on or before `start` to on or after `end` still matches.
pub fn custom_period(records: &[TaskRecord], start: NaiveDate, end: NaiveDate) -> Vec<TaskRecord> {
    select(
        records,
        &TaskPredicate::OverlapsPeriod(DateRange::new(start, end)),
    )
}

/// Unfinished records whose end date has passed.
pub fn overdue(records: &[TaskRecord], today: NaiveDate) -> Vec<TaskRecord> {
    let predicate = TaskPredicate::Completed
        .negate()
        .and(TaskPredicate::EndBefore(today));
    select(records, &predicate)
}

/// Dated records whose span contains `day`.
pub fn on_day(records: &[TaskRecord], day: NaiveDate) -> Vec<TaskRecord> {
    select(records, &TaskPredicate::SpansDay(day))
}

/// Dated records running at some point during the calendar month.
///
/// Both dates must be present. Returns an empty list for an invalid year/month.
pub fn in_month(records: &[TaskRecord], year: i32, month: u32) -> Vec<TaskRecord> {
    match DateRange::month(year, month) {
        Some(range) => select(records, &TaskPredicate::OpenDuring(range)),
        None => Vec::new(),
    }
}
