//! Core domain types
//!
//! These types describe one polling job as declared in a fragment file and
//! are shared between the parser (which produces them) and the runner
//! (which compares and executes them).

pub mod job;
pub mod severity;
