//! Httpdir Core
//!
//! Core types for the httpdir job directory system.
//!
//! This crate contains:
//! - Domain types: typed HTTP polling settings, common input settings, retry policy
//! - Declarations: a parsed job plus the deferred builder that resolves it

pub mod declaration;
pub mod domain;

pub use declaration::{JobBuilder, JobDeclaration, JobSpec};
pub use domain::job::{CommonInputConfig, ConfigError, Header, HttpInputConfig, RetryOptions};
pub use domain::severity::Severity;
