//! Pure statistics over record sequences.

use crate::model::parameter::ParameterCategory;
use crate::model::task::TaskRecord;
use chrono::Datelike;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Headline counts for a record sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub total: usize,
    pub completed: usize,
    /// Percentage in `0.0..=100.0`.
    pub completion_rate: f64,
}

/// Completion rate of one ISO week bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyRate {
    /// `YYYY-Www`, ISO week-numbering year and week.
    pub week: String,
    pub completed: usize,
    pub total: usize,
    pub rate: f64,
}

/// Share of completed records as a percentage; `0.0` for an empty input.
pub fn progress(records: &[TaskRecord]) -> f64 {
    let completed = records.iter().filter(|r| r.is_completed()).count();
    percent(completed, records.len())
}

pub fn summary(records: &[TaskRecord]) -> TaskSummary {
    let completed = records.iter().filter(|r| r.is_completed()).count();
    TaskSummary {
        total: records.len(),
        completed,
        completion_rate: percent(completed, records.len()),
    }
}

/// Tally of records per key.
pub fn group_counts<K, F>(records: &[TaskRecord], key_fn: F) -> HashMap<K, usize>
where
    K: Eq + Hash,
    F: Fn(&TaskRecord) -> K,
{
    let mut counts = HashMap::new();
    for record in records {
        *counts.entry(key_fn(record)).or_insert(0) += 1;
    }
    counts
}

/// Tally keyed by the tuple of values of `categories`, ordered by key.
pub fn group_counts_by(
    records: &[TaskRecord],
    categories: &[ParameterCategory],
) -> BTreeMap<Vec<String>, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        let key = categories
            .iter()
            .map(|category| category.value_of(record).to_string())
            .collect::<Vec<_>>();
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// Completion rate per ISO week of `last_update`, oldest week first.
pub fn weekly_completion_rate(records: &[TaskRecord]) -> Vec<WeeklyRate> {
    let mut buckets: BTreeMap<(i32, u32), (usize, usize)> = BTreeMap::new();
    for record in records {
        let week = record.last_update.iso_week();
        let (completed, total) = buckets.entry((week.year(), week.week())).or_insert((0, 0));
        *total += 1;
        if record.is_completed() {
            *completed += 1;
        }
    }

    buckets
        .into_iter()
        .map(|((year, week), (completed, total))| WeeklyRate {
            week: format!("{year}-W{week:02}"),
            completed,
            total,
            rate: percent(completed, total),
        })
        .collect()
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}
