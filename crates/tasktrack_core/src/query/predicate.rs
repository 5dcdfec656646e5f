//! Composable record predicates.
//!
//! Leaf predicates test one aspect of a record; `All`, `Any` and `Not`
//! combine them. Every view in this crate is expressed as a predicate so it
//! can be tested and composed on its own.

use crate::model::parameter::ParameterCategory;
use crate::model::task::TaskRecord;
use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Inclusive calendar date window. A window with `start > end` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The whole calendar month, or `None` for an invalid year/month.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self::new(start, next.pred_opt()?))
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Boolean test over one task record.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskPredicate {
    /// Matches every record.
    Always,
    /// Case-insensitive substring match on `sub_task`.
    SubTaskContains(String),
    /// Field value is one of the listed values.
    FieldIn(ParameterCategory, Vec<String>),
    /// `start_date` present and inside the window.
    StartWithin(DateRange),
    /// `end_date` present and inside the window.
    EndWithin(DateRange),
    /// `end_date` present and strictly before the date.
    EndBefore(NaiveDate),
    /// Status is the completed literal.
    Completed,
    /// `last_update` at or after the instant.
    UpdatedSince(DateTime<Utc>),
    /// Start or end date falls in the calendar year.
    TouchesYear(i32),
    /// Start in window, end in window, or the record's span contains it.
    OverlapsPeriod(DateRange),
    /// Both dates present and the span contains the day.
    SpansDay(NaiveDate),
    /// Both dates present, started on or before the window's end and not
    /// ended before its start.
    OpenDuring(DateRange),
    All(Vec<TaskPredicate>),
    Any(Vec<TaskPredicate>),
    Not(Box<TaskPredicate>),
}

impl TaskPredicate {
    pub fn matches(&self, record: &TaskRecord) -> bool {
        match self {
            Self::Always => true,
            Self::SubTaskContains(needle) => record
                .sub_task
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Self::FieldIn(category, values) => {
                let value = category.value_of(record);
                values.iter().any(|candidate| candidate == value)
            }
            Self::StartWithin(range) => record.start_date.is_some_and(|d| range.contains(d)),
            Self::EndWithin(range) => record.end_date.is_some_and(|d| range.contains(d)),
            Self::EndBefore(date) => record.end_date.is_some_and(|end| end < *date),
            Self::Completed => record.is_completed(),
            Self::UpdatedSince(instant) => record.last_update >= *instant,
            Self::TouchesYear(year) => {
                record.start_date.is_some_and(|d| d.year() == *year)
                    || record.end_date.is_some_and(|d| d.year() == *year)
            }
            Self::OverlapsPeriod(range) => {
                let spans = matches!(
                    (record.start_date, record.end_date),
                    (Some(start), Some(end)) if start <= range.start && end >= range.end
                );
                record.start_date.is_some_and(|d| range.contains(d))
                    || record.end_date.is_some_and(|d| range.contains(d))
                    || spans
            }
            Self::SpansDay(day) => matches!(
                (record.start_date, record.end_date),
                (Some(start), Some(end)) if start <= *day && *day <= end
            ),
            Self::OpenDuring(range) => {
                !range.is_empty()
                    && matches!(
                        (record.start_date, record.end_date),
                        (Some(start), Some(end)) if start <= range.end && end >= range.start
                    )
            }
            Self::All(parts) => parts.iter().all(|part| part.matches(record)),
            Self::Any(parts) => parts.iter().any(|part| part.matches(record)),
            Self::Not(inner) => !inner.matches(record),
        }
    }

    /// Conjunction; flattens nested `All`.
    pub fn and(self, other: TaskPredicate) -> TaskPredicate {
        match (self, other) {
            (Self::Always, other) | (other, Self::Always) => other,
            (Self::All(mut parts), Self::All(more)) => {
                parts.extend(more);
                Self::All(parts)
            }
            (Self::All(mut parts), other) => {
                parts.push(other);
                Self::All(parts)
            }
            (first, second) => Self::All(vec![first, second]),
        }
    }

    pub fn negate(self) -> TaskPredicate {
        Self::Not(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::{TaskFields, TaskRecord};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(start: Option<NaiveDate>, end: Option<NaiveDate>) -> TaskRecord {
        let mut fields = TaskFields::new("Probe");
        fields.start_date = start;
        fields.end_date = end;
        TaskRecord::create(fields, Utc::now()).unwrap()
    }

    #[test]
    fn month_range_handles_december_and_leap_february() {
        let dec = DateRange::month(2024, 12).unwrap();
        assert_eq!(dec.end, date(2024, 12, 31));
        let feb = DateRange::month(2024, 2).unwrap();
        assert_eq!(feb.end, date(2024, 2, 29));
        assert!(DateRange::month(2024, 13).is_none());
    }

    #[test]
    fn and_flattens_and_drops_always() {
        let combined = TaskPredicate::Always
            .and(TaskPredicate::Completed)
            .and(TaskPredicate::TouchesYear(2024));
        assert_eq!(
            combined,
            TaskPredicate::All(vec![TaskPredicate::Completed, TaskPredicate::TouchesYear(2024)])
        );
    }

    #[test]
    fn open_during_requires_both_dates() {
        let month = DateRange::month(2024, 6).unwrap();
        assert!(TaskPredicate::OpenDuring(month)
            .matches(&record(Some(date(2024, 5, 1)), Some(date(2024, 6, 1)))));
        assert!(!TaskPredicate::OpenDuring(month).matches(&record(Some(date(2024, 5, 1)), None)));
        assert!(!TaskPredicate::OpenDuring(month).matches(&record(None, Some(date(2024, 6, 5)))));
        assert!(!TaskPredicate::OpenDuring(month)
            .matches(&record(Some(date(2024, 1, 1)), Some(date(2024, 5, 31)))));
    }

    #[test]
    fn inverted_period_still_matches_on_the_span_clause() {
        let inverted = DateRange::new(date(2024, 6, 10), date(2024, 6, 1));
        let short = record(Some(date(2024, 6, 5)), Some(date(2024, 6, 6)));
        let long = record(Some(date(2024, 5, 20)), Some(date(2024, 6, 20)));
        let late = record(Some(date(2024, 6, 12)), Some(date(2024, 6, 30)));
        let undated_end = record(Some(date(2024, 6, 5)), None);

        assert!(TaskPredicate::OverlapsPeriod(inverted).matches(&short));
        assert!(TaskPredicate::OverlapsPeriod(inverted).matches(&long));
        assert!(!TaskPredicate::OverlapsPeriod(inverted).matches(&late));
        assert!(!TaskPredicate::OverlapsPeriod(inverted).matches(&undated_end));
    }
}
