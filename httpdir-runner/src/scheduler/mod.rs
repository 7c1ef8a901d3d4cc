//! Scheduler layer for the runner
//!
//! This layer drives reconciliation: the `Reconciler` owns the set of
//! running jobs and `DirectoryInput` runs it on a fixed interval.

pub mod directory_input;
pub mod reconciler;

pub use directory_input::DirectoryInput;
