//! Service layer
//!
//! Services start, stop and run the workers behind declared jobs.
//!
//! The lifecycle manager is trait-based so the reconciler can be driven
//! against a recording implementation in tests.

mod lifecycle;
mod poller;

// Re-export traits
pub use lifecycle::LifecycleManager;

// Re-export implementations
pub use lifecycle::{JobHandle, LifecycleError, TaskLifecycleManager};
