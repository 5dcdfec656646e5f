//! Controlled vocabulary for enumerated task fields.
//!
//! # Responsibility
//! - Hold the ordered allowed values per parameter category.
//! - Validate task field sets against the registry.
//!
//! # Invariants
//! - Values within one category are unique and non-empty.
//! - Value order is meaningful: the first value is the default selection.
//! - The set of categories is fixed; only their values are user-editable.

use crate::model::task::{TaskFields, TaskRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Fixed parameter categories backing the constrained task fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterCategory {
    Status,
    Priority,
    Responsible,
    MainTask,
}

impl ParameterCategory {
    /// All categories in display order.
    pub const ALL: [Self; 4] = [
        Self::Status,
        Self::Priority,
        Self::Responsible,
        Self::MainTask,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Priority => "priority",
            Self::Responsible => "responsible",
            Self::MainTask => "main_task",
        }
    }

    /// Reads the record field constrained by this category.
    pub fn value_of(self, record: &TaskRecord) -> &str {
        match self {
            Self::Status => &record.status,
            Self::Priority => &record.priority,
            Self::Responsible => &record.responsible,
            Self::MainTask => &record.main_task,
        }
    }

    fn field_of(self, fields: &TaskFields) -> &str {
        match self {
            Self::Status => &fields.status,
            Self::Priority => &fields.priority,
            Self::Responsible => &fields.responsible,
            Self::MainTask => &fields.main_task,
        }
    }

    fn field_mut(self, fields: &mut TaskFields) -> &mut String {
        match self {
            Self::Status => &mut fields.status,
            Self::Priority => &mut fields.priority,
            Self::Responsible => &mut fields.responsible,
            Self::MainTask => &mut fields.main_task,
        }
    }

    fn defaults(self) -> &'static [&'static str] {
        match self {
            Self::Status => &["Not Started", "In Progress", "Completed", "On Hold"],
            Self::Priority => &["Low", "Medium", "High", "Critical"],
            Self::Responsible => &["Team Member 1", "Team Member 2", "Team Member 3"],
            Self::MainTask => &["Project A", "Project B", "Maintenance", "Research"],
        }
    }
}

impl Display for ParameterCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "status" => Ok(Self::Status),
            "priority" => Ok(Self::Priority),
            "responsible" => Ok(Self::Responsible),
            "main_task" => Ok(Self::MainTask),
            other => Err(format!(
                "unknown parameter category `{other}`; expected status|priority|responsible|main_task"
            )),
        }
    }
}

/// Validation failures for parameter mutations and registry checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("{category} value cannot be empty")]
    EmptyValue { category: ParameterCategory },
    #[error("'{value}' already exists in {category}")]
    Duplicate {
        category: ParameterCategory,
        value: String,
    },
    #[error("'{value}' is not an allowed {category} value")]
    UnknownValue {
        category: ParameterCategory,
        value: String,
    },
    #[error("new {category} order must be a permutation of the current values")]
    InvalidOrder { category: ParameterCategory },
}

/// Ordered allowed values per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<ParameterCategory, Vec<String>>",
    into = "BTreeMap<ParameterCategory, Vec<String>>"
)]
pub struct ParameterSet {
    values: BTreeMap<ParameterCategory, Vec<String>>,
}

impl Default for ParameterSet {
    fn default() -> Self {
        let values = ParameterCategory::ALL
            .into_iter()
            .map(|category| {
                let defaults = category
                    .defaults()
                    .iter()
                    .map(|value| (*value).to_string())
                    .collect();
                (category, defaults)
            })
            .collect();
        Self { values }
    }
}

impl ParameterSet {
    /// Creates a set where every category is empty.
    pub fn empty() -> Self {
        Self {
            values: ParameterCategory::ALL
                .into_iter()
                .map(|category| (category, Vec::new()))
                .collect(),
        }
    }

    pub fn values(&self, category: ParameterCategory) -> &[String] {
        self.values.get(&category).map_or(&[], Vec::as_slice)
    }

    /// Preselected value for new tasks: the second priority when there is
    /// one, otherwise the first value of the category.
    pub fn default_value(&self, category: ParameterCategory) -> Option<&str> {
        let values = self.values(category);
        let preferred = match category {
            ParameterCategory::Priority => values.get(1),
            _ => None,
        };
        preferred.or_else(|| values.first()).map(String::as_str)
    }

    /// Fields for a new task with every constrained field preselected.
    ///
    /// An empty category leaves the `TaskFields::new` value in place.
    pub fn new_task_fields(&self, sub_task: impl Into<String>) -> TaskFields {
        let mut fields = TaskFields::new(sub_task);
        for category in ParameterCategory::ALL {
            if let Some(value) = self.default_value(category) {
                *category.field_mut(&mut fields) = value.to_string();
            }
        }
        fields
    }

    pub fn contains(&self, category: ParameterCategory, value: &str) -> bool {
        self.values(category).iter().any(|existing| existing == value)
    }

    /// Appends a new value to the end of the category.
    ///
    /// # Errors
    /// - `EmptyValue` when the trimmed value is empty.
    /// - `Duplicate` when the value already exists.
    pub fn add(&mut self, category: ParameterCategory, value: &str) -> Result<(), ParameterError> {
        let value = normalize_value(category, value)?;
        if self.contains(category, &value) {
            return Err(ParameterError::Duplicate { category, value });
        }
        self.values.entry(category).or_default().push(value);
        Ok(())
    }

    /// Removes one value from the category.
    pub fn remove(
        &mut self,
        category: ParameterCategory,
        value: &str,
    ) -> Result<(), ParameterError> {
        let index = self.position(category, value)?;
        self.values.entry(category).or_default().remove(index);
        Ok(())
    }

    /// Moves a value one slot towards the front; no-op for the first value.
    pub fn move_up(
        &mut self,
        category: ParameterCategory,
        value: &str,
    ) -> Result<(), ParameterError> {
        let index = self.position(category, value)?;
        if index > 0 {
            self.values.entry(category).or_default().swap(index - 1, index);
        }
        Ok(())
    }

    /// Moves a value one slot towards the back; no-op for the last value.
    pub fn move_down(
        &mut self,
        category: ParameterCategory,
        value: &str,
    ) -> Result<(), ParameterError> {
        let index = self.position(category, value)?;
        let list = self.values.entry(category).or_default();
        if index + 1 < list.len() {
            list.swap(index, index + 1);
        }
        Ok(())
    }

    /// Replaces the whole order of a category.
    ///
    /// # Errors
    /// - `InvalidOrder` unless `order` is a permutation of the current values.
    pub fn reorder(
        &mut self,
        category: ParameterCategory,
        order: Vec<String>,
    ) -> Result<(), ParameterError> {
        let mut current = self.values(category).to_vec();
        let mut proposed = order.clone();
        current.sort();
        proposed.sort();
        if current != proposed {
            return Err(ParameterError::InvalidOrder { category });
        }
        self.values.insert(category, order);
        Ok(())
    }

    /// Checks that every constrained field is empty or an allowed value.
    pub fn check_fields(&self, fields: &TaskFields) -> Result<(), ParameterError> {
        for category in ParameterCategory::ALL {
            let value = category.field_of(fields);
            if !value.is_empty() && !self.contains(category, value) {
                return Err(ParameterError::UnknownValue {
                    category,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    fn position(&self, category: ParameterCategory, value: &str) -> Result<usize, ParameterError> {
        self.values(category)
            .iter()
            .position(|existing| existing == value)
            .ok_or_else(|| ParameterError::UnknownValue {
                category,
                value: value.to_string(),
            })
    }
}

impl TryFrom<BTreeMap<ParameterCategory, Vec<String>>> for ParameterSet {
    type Error = ParameterError;

    fn try_from(raw: BTreeMap<ParameterCategory, Vec<String>>) -> Result<Self, Self::Error> {
        let mut set = Self::empty();
        for (category, values) in raw {
            for value in values {
                set.add(category, &value)?;
            }
        }
        Ok(set)
    }
}

impl From<ParameterSet> for BTreeMap<ParameterCategory, Vec<String>> {
    fn from(set: ParameterSet) -> Self {
        set.values
    }
}

fn normalize_value(category: ParameterCategory, value: &str) -> Result<String, ParameterError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ParameterError::EmptyValue { category });
    }
    Ok(trimmed.to_string())
}
