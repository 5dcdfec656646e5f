//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define whole-collection storage contracts for tasks and parameters.
//! - Isolate JSON file and SQLite details from the stores.
//!
//! # Invariants
//! - Every write replaces the stored collection as one atomic unit.
//! - Repositories return semantic errors (`InvalidData`) in addition to
//!   transport errors (`Io`, `Json`, `Db`).

pub(crate) mod file;
pub mod parameter_repo;
pub mod task_repo;
