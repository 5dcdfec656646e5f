//! Session-owned stores.
//!
//! # Responsibility
//! - Hold the authoritative in-memory state for tasks and parameters.
//! - Keep callers decoupled from storage backends.

pub mod parameter_store;
pub mod task_store;
