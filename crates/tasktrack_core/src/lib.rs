//! Core domain logic for tasktrack.
//! This crate is the single source of truth for task lifecycle, vocabulary
//! and reporting invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use config::{load_config, ConfigError, StorageBackend, TrackerConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::parameter::{ParameterCategory, ParameterError, ParameterSet};
pub use model::task::{TaskFields, TaskId, TaskRecord, TaskValidationError};
pub use query::filter::TaskFilter;
pub use query::predicate::{DateRange, TaskPredicate};
pub use query::stats::{TaskSummary, WeeklyRate};
pub use repo::parameter_repo::{
    JsonParameterRepository, ParameterRepository, SqliteParameterRepository,
};
pub use repo::task_repo::{
    JsonTaskRepository, RepoError, RepoResult, SqliteTaskRepository, TaskRepository,
};
pub use service::parameter_store::{ParameterStore, ParameterStoreError};
pub use service::task_store::{StoreError, StoreResult, TaskStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
