//! Text and JSON rendering shared by every command.

use anyhow::Result;
use serde::Serialize;
use std::fmt::Display;
use std::io::{self, Write};
use tasktrack_core::model::parameter::{ParameterCategory, ParameterSet};
use tasktrack_core::query::stats::{TaskSummary, WeeklyRate};
use tasktrack_core::TaskRecord;

const SUB_TASK_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// One row of a grouped count in JSON output.
#[derive(Debug, Serialize)]
pub struct GroupCount {
    pub key: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub summary: TaskSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupCount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly: Option<Vec<WeeklyRate>>,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

pub fn print_tasks(mode: OutputMode, tasks: &[TaskRecord]) -> Result<()> {
    if mode == OutputMode::Json {
        return print_json(tasks);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if tasks.is_empty() {
        writeln!(out, "no tasks")?;
        return Ok(());
    }
    writeln!(
        out,
        "{:<36}  {:<12}  {:<8}  {:<10}  {:<10}  {:<14}  SUB TASK",
        "ID", "STATUS", "PRIORITY", "START", "END", "MAIN TASK"
    )?;
    for task in tasks {
        writeln!(
            out,
            "{:<36}  {:<12}  {:<8}  {:<10}  {:<10}  {:<14}  {}",
            task.id,
            task.status,
            task.priority,
            date_or_dash(task.start_date),
            date_or_dash(task.end_date),
            task.main_task,
            truncate(&task.sub_task, SUB_TASK_WIDTH)
        )?;
    }
    writeln!(out, "{} task(s)", tasks.len())?;
    Ok(())
}

pub fn print_task(mode: OutputMode, task: &TaskRecord) -> Result<()> {
    if mode == OutputMode::Json {
        return print_json(task);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let rows = [
        ("id", task.id.to_string()),
        ("sub task", task.sub_task.clone()),
        ("main task", task.main_task.clone()),
        ("priority", task.priority.clone()),
        ("status", task.status.clone()),
        ("responsible", task.responsible.clone()),
        ("start", date_or_dash(task.start_date)),
        ("end", date_or_dash(task.end_date)),
        ("updated", task.last_update.to_rfc3339()),
        ("deleted", task.is_deleted.to_string()),
    ];
    for (key, value) in rows {
        writeln!(out, "{:<12} {}", format!("{key}:"), value)?;
    }
    if !task.notes.is_empty() {
        writeln!(out, "notes:\n{}", task.notes)?;
    }
    Ok(())
}

pub fn print_parameters(
    mode: OutputMode,
    parameters: &ParameterSet,
    only: Option<ParameterCategory>,
) -> Result<()> {
    let categories: Vec<ParameterCategory> = match only {
        Some(category) => vec![category],
        None => ParameterCategory::ALL.to_vec(),
    };

    if mode == OutputMode::Json {
        let selected = categories
            .iter()
            .map(|category| (category.as_str(), parameters.values(*category)))
            .collect::<std::collections::BTreeMap<_, _>>();
        return print_json(&selected);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for category in categories {
        writeln!(out, "{category}:")?;
        for (index, value) in parameters.values(category).iter().enumerate() {
            writeln!(out, "  {}. {value}", index + 1)?;
        }
    }
    Ok(())
}

pub fn print_stats(mode: OutputMode, report: &StatsReport) -> Result<()> {
    if mode == OutputMode::Json {
        return print_json(report);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(
        out,
        "completed {}/{} ({:.2}%)",
        report.summary.completed, report.summary.total, report.summary.completion_rate
    )?;
    if let Some(groups) = &report.groups {
        writeln!(out)?;
        for group in groups {
            writeln!(out, "{:>5}  {}", group.count, group.key.join(" / "))?;
        }
    }
    if let Some(weekly) = &report.weekly {
        writeln!(out)?;
        for week in weekly {
            writeln!(
                out,
                "{}  {:>3}/{:<3} {:>6.2}%",
                week.week, week.completed, week.total, week.rate
            )?;
        }
    }
    Ok(())
}

/// Confirmation line for a mutation. JSON mode emits `{"action","id"}`.
pub fn print_done(mode: OutputMode, action: &str, id: &impl Display) -> Result<()> {
    if mode == OutputMode::Json {
        return print_json(&serde_json::json!({ "action": action, "id": id.to_string() }));
    }
    println!("{action} {id}");
    Ok(())
}

pub fn warning(message: &impl Display) {
    eprintln!("warning: {message}");
}

fn date_or_dash(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated = value.chars().take(max_chars - 3).collect::<String>();
    truncated.push_str("...");
    truncated
}
