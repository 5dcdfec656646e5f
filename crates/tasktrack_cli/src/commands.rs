//! Subcommand definitions and handlers.
//!
//! Handlers only translate arguments into store, query and stats calls.
//! Storage warnings are printed to stderr and do not fail the command.

use crate::output::{self, GroupCount, OutputMode, StatsReport};
use anyhow::{bail, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::{Args, Subcommand};
use tasktrack_core::query::{filter, stats};
use tasktrack_core::{
    DateRange, ParameterCategory, ParameterRepository, ParameterStore, ParameterStoreError,
    StoreError, StoreResult, TaskFields, TaskFilter, TaskId, TaskRepository, TaskStore,
    TrackerConfig,
};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a task.
    Add {
        /// Task description.
        sub_task: String,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Edit a task. Omitted fields keep their current value.
    Edit {
        id: TaskId,
        #[arg(long)]
        sub_task: Option<String>,
        /// Refuse the edit unless the stored last_update equals this RFC 3339 timestamp.
        #[arg(long)]
        expect: Option<DateTime<Utc>>,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Soft-delete a task.
    Delete { id: TaskId },
    /// Restore a soft-deleted task.
    Restore { id: TaskId },
    /// Permanently remove a task.
    Purge { id: TaskId },
    /// Show one task.
    Show { id: TaskId },
    /// List active tasks, or soft-deleted ones with --deleted.
    List {
        #[arg(long)]
        deleted: bool,
    },
    /// Filter active tasks.
    Filter(FilterArgs),
    /// Tasks completed within the last N days.
    Recent {
        #[arg(long)]
        days: Option<u32>,
    },
    /// Unfinished tasks due within the next N days.
    Upcoming {
        #[arg(long)]
        days: Option<u32>,
    },
    /// Tasks starting or ending this year.
    Year,
    /// Tasks overlapping a date range.
    Period { start: NaiveDate, end: NaiveDate },
    /// Unfinished tasks past their end date.
    Overdue,
    /// Tasks running on a given day.
    Day { date: NaiveDate },
    /// Tasks running during a calendar month.
    Month { year: i32, month: u32 },
    /// Completion statistics over active tasks.
    Stats(StatsArgs),
    /// Manage allowed field values.
    #[command(subcommand)]
    Params(ParamsCommand),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Edit { .. } => "edit",
            Self::Delete { .. } => "delete",
            Self::Restore { .. } => "restore",
            Self::Purge { .. } => "purge",
            Self::Show { .. } => "show",
            Self::List { .. } => "list",
            Self::Filter(_) => "filter",
            Self::Recent { .. } => "recent",
            Self::Upcoming { .. } => "upcoming",
            Self::Year => "year",
            Self::Period { .. } => "period",
            Self::Overdue => "overdue",
            Self::Day { .. } => "day",
            Self::Month { .. } => "month",
            Self::Stats(_) => "stats",
            Self::Params(_) => "params",
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct FieldArgs {
    #[arg(long)]
    pub main_task: Option<String>,
    #[arg(long)]
    pub priority: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub responsible: Option<String>,
    /// Start date, YYYY-MM-DD.
    #[arg(long, conflicts_with = "clear_start")]
    pub start: Option<NaiveDate>,
    /// End date, YYYY-MM-DD.
    #[arg(long, conflicts_with = "clear_end")]
    pub end: Option<NaiveDate>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long)]
    pub clear_start: bool,
    #[arg(long)]
    pub clear_end: bool,
}

impl FieldArgs {
    fn apply_to(self, fields: &mut TaskFields) {
        let text_fields = [
            (self.main_task, &mut fields.main_task),
            (self.priority, &mut fields.priority),
            (self.status, &mut fields.status),
            (self.responsible, &mut fields.responsible),
            (self.notes, &mut fields.notes),
        ];
        for (value, slot) in text_fields {
            if let Some(value) = value {
                *slot = value;
            }
        }

        if self.clear_start {
            fields.start_date = None;
        } else if self.start.is_some() {
            fields.start_date = self.start;
        }
        if self.clear_end {
            fields.end_date = None;
        } else if self.end.is_some() {
            fields.end_date = self.end;
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Case-insensitive substring of the sub task.
    #[arg(long)]
    pub contains: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub main_task: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub priority: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub status: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub responsible: Vec<String>,
    #[arg(long)]
    pub start_from: Option<NaiveDate>,
    #[arg(long)]
    pub start_to: Option<NaiveDate>,
    #[arg(long)]
    pub end_from: Option<NaiveDate>,
    #[arg(long)]
    pub end_to: Option<NaiveDate>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> TaskFilter {
        TaskFilter {
            sub_task_contains: self.contains.clone(),
            main_task_in: non_empty(&self.main_task),
            priority_in: non_empty(&self.priority),
            status_in: non_empty(&self.status),
            responsible_in: non_empty(&self.responsible),
            start_range: open_range(self.start_from, self.start_to),
            end_range: open_range(self.end_from, self.end_to),
        }
    }
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Group counts by these fields, e.g. `status,priority`.
    #[arg(long, value_delimiter = ',')]
    pub by: Vec<ParameterCategory>,
    /// Include the weekly completion trend.
    #[arg(long)]
    pub weekly: bool,
}

#[derive(Subcommand, Debug)]
pub enum ParamsCommand {
    /// List values, optionally for one category.
    List { category: Option<ParameterCategory> },
    /// Append a value.
    Add {
        category: ParameterCategory,
        value: String,
    },
    /// Remove a value.
    Remove {
        category: ParameterCategory,
        value: String,
    },
    /// Move a value one place up.
    Up {
        category: ParameterCategory,
        value: String,
    },
    /// Move a value one place down.
    Down {
        category: ParameterCategory,
        value: String,
    },
    /// Replace the whole order of a category.
    Reorder {
        category: ParameterCategory,
        #[arg(required = true)]
        values: Vec<String>,
    },
}

/// Shared state handed to every handler.
pub struct Session<'a, R: TaskRepository, P: ParameterRepository> {
    pub tasks: TaskStore<R>,
    pub parameters: ParameterStore<P>,
    pub config: &'a TrackerConfig,
    pub mode: OutputMode,
}

pub fn run<R, P>(command: Command, session: &mut Session<'_, R, P>) -> Result<()>
where
    R: TaskRepository,
    P: ParameterRepository,
{
    let mode = session.mode;
    match command {
        Command::Add { sub_task, fields } => {
            let mut task_fields = session.parameters.parameters().new_task_fields(sub_task);
            fields.apply_to(&mut task_fields);
            session.parameters.check_fields(&task_fields)?;
            let id = match session.tasks.add(task_fields) {
                Ok(id) => id,
                Err(StoreError::StorageWrite {
                    task_id: Some(id),
                    source,
                }) => {
                    output::warning(&format!(
                        "task {id} was created but could not be saved: {source}"
                    ));
                    id
                }
                Err(err) => return Err(err.into()),
            };
            output::print_done(mode, "added", &id)
        }
        Command::Edit {
            id,
            sub_task,
            expect,
            fields,
        } => {
            let Some(record) = session.tasks.get(&id) else {
                return Err(StoreError::NotFound(id).into());
            };
            let expected = expect.unwrap_or(record.last_update);
            let mut task_fields = record.fields();
            if let Some(sub_task) = sub_task {
                task_fields.sub_task = sub_task;
            }
            fields.apply_to(&mut task_fields);
            session.parameters.check_fields(&task_fields)?;
            tolerate(session.tasks.update_checked(&id, expected, task_fields))?;
            output::print_done(mode, "updated", &id)
        }
        Command::Delete { id } => {
            tolerate(session.tasks.soft_delete(&id))?;
            output::print_done(mode, "deleted", &id)
        }
        Command::Restore { id } => {
            tolerate(session.tasks.restore(&id))?;
            output::print_done(mode, "restored", &id)
        }
        Command::Purge { id } => {
            tolerate(session.tasks.hard_delete(&id))?;
            output::print_done(mode, "purged", &id)
        }
        Command::Show { id } => match session.tasks.get(&id) {
            Some(record) => output::print_task(mode, record),
            None => Err(StoreError::NotFound(id).into()),
        },
        Command::List { deleted } => {
            let records = if deleted {
                session.tasks.deleted()
            } else {
                session.tasks.active()
            };
            output::print_tasks(mode, &records)
        }
        Command::Filter(args) => {
            let records = filter::filter(&session.tasks.active(), &args.to_filter());
            output::print_tasks(mode, &records)
        }
        Command::Recent { days } => {
            let days = days.unwrap_or(session.config.queries.recent_days);
            let records = filter::recently_completed(&session.tasks.active(), days, Utc::now());
            output::print_tasks(mode, &records)
        }
        Command::Upcoming { days } => {
            let days = days.unwrap_or(session.config.queries.upcoming_days);
            let records = filter::upcoming(&session.tasks.active(), days, today());
            output::print_tasks(mode, &records)
        }
        Command::Year => {
            let records = filter::current_year(&session.tasks.active(), today());
            output::print_tasks(mode, &records)
        }
        Command::Period { start, end } => {
            if start > end {
                output::warning(&format!("period start {start} is after end {end}"));
            }
            let records = filter::custom_period(&session.tasks.active(), start, end);
            output::print_tasks(mode, &records)
        }
        Command::Overdue => {
            let records = filter::overdue(&session.tasks.active(), today());
            output::print_tasks(mode, &records)
        }
        Command::Day { date } => {
            let records = filter::on_day(&session.tasks.active(), date);
            output::print_tasks(mode, &records)
        }
        Command::Month { year, month } => {
            if DateRange::month(year, month).is_none() {
                bail!("invalid month {year}-{month}");
            }
            let records = filter::in_month(&session.tasks.active(), year, month);
            output::print_tasks(mode, &records)
        }
        Command::Stats(args) => {
            let records = session.tasks.active();
            let groups = (!args.by.is_empty()).then(|| {
                stats::group_counts_by(&records, &args.by)
                    .into_iter()
                    .map(|(key, count)| GroupCount { key, count })
                    .collect()
            });
            let weekly = args
                .weekly
                .then(|| stats::weekly_completion_rate(&records));
            let report = StatsReport {
                summary: stats::summary(&records),
                groups,
                weekly,
            };
            output::print_stats(mode, &report)
        }
        Command::Params(command) => run_params(command, session),
    }
}

fn run_params<R, P>(command: ParamsCommand, session: &mut Session<'_, R, P>) -> Result<()>
where
    R: TaskRepository,
    P: ParameterRepository,
{
    let mode = session.mode;
    let store = &mut session.parameters;
    let (action, category, result) = match command {
        ParamsCommand::List { category } => {
            return output::print_parameters(mode, store.parameters(), category);
        }
        ParamsCommand::Add { category, value } => ("added", category, store.add(category, &value)),
        ParamsCommand::Remove { category, value } => {
            ("removed", category, store.remove(category, &value))
        }
        ParamsCommand::Up { category, value } => {
            ("moved up", category, store.move_up(category, &value))
        }
        ParamsCommand::Down { category, value } => {
            ("moved down", category, store.move_down(category, &value))
        }
        ParamsCommand::Reorder { category, values } => {
            ("reordered", category, store.reorder(category, values))
        }
    };

    match result {
        Err(err @ ParameterStoreError::StorageWrite(_)) => output::warning(&err),
        other => other?,
    }
    output::print_done(mode, action, &category)?;
    Ok(())
}

fn tolerate(result: StoreResult<()>) -> Result<()> {
    match result {
        Err(err) if err.is_warning() => {
            output::warning(&err);
            Ok(())
        }
        other => Ok(other?),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

/// Fills a missing bound with the far past or far future.
fn open_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<DateRange> {
    if from.is_none() && to.is_none() {
        return None;
    }
    Some(DateRange::new(
        from.unwrap_or(NaiveDate::MIN),
        to.unwrap_or(NaiveDate::MAX),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_args_override_only_supplied_values() {
        let mut fields = TaskFields::new("Design");
        fields.start_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        fields.notes = "keep".to_string();

        FieldArgs {
            status: Some("In Progress".to_string()),
            clear_start: true,
            ..FieldArgs::default()
        }
        .apply_to(&mut fields);

        assert_eq!(fields.status, "In Progress");
        assert_eq!(fields.notes, "keep");
        assert_eq!(fields.start_date, None);
        assert_eq!(fields.sub_task, "Design");
    }

    #[test]
    fn add_preselects_registry_values_for_omitted_fields() {
        use tasktrack_core::{db, SqliteParameterRepository, SqliteTaskRepository};

        let conn = db::open_db_in_memory().unwrap();
        let config = TrackerConfig::default();
        let mut session = Session {
            tasks: TaskStore::open(SqliteTaskRepository::new(&conn)),
            parameters: ParameterStore::open(SqliteParameterRepository::new(&conn)),
            config: &config,
            mode: OutputMode::Json,
        };

        let command = Command::Add {
            sub_task: "Draft".to_string(),
            fields: FieldArgs {
                status: Some("In Progress".to_string()),
                ..FieldArgs::default()
            },
        };
        run(command, &mut session).unwrap();

        let added = &session.tasks.records()[0];
        assert_eq!(added.main_task, "Project A");
        assert_eq!(added.priority, "Medium");
        assert_eq!(added.status, "In Progress");
        assert_eq!(added.responsible, "Team Member 1");
    }

    #[test]
    fn filter_args_without_criteria_build_empty_filter() {
        assert_eq!(FilterArgs::default().to_filter(), TaskFilter::default());
    }

    #[test]
    fn half_open_range_uses_far_bounds() {
        let from = NaiveDate::from_ymd_opt(2024, 3, 1);
        let range = open_range(from, None).unwrap();
        assert_eq!(range.start, from.unwrap());
        assert_eq!(range.end, NaiveDate::MAX);
        assert!(open_range(None, None).is_none());
    }
}
