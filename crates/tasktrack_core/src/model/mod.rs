//! Domain model for task records and their controlled vocabulary.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep validation of record invariants next to the types they protect.
//!
//! # Invariants
//! - Every task record is identified by a stable `TaskId`.
//! - Deletion is a soft-delete tombstone until an explicit hard delete.

pub mod parameter;
pub mod task;
