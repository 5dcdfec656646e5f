//! Read-only views over task record sequences.
//!
//! # Responsibility
//! - `filter`: ad-hoc criteria and canned date-window views.
//! - `predicate`: the composable building blocks behind every view.
//! - `stats`: completion rate, group counts and weekly trends.
//!
//! # Invariants
//! - Nothing in this module touches storage or mutates its input.

pub mod filter;
pub mod predicate;
pub mod stats;
