//! Job declarations
//!
//! A `JobDeclaration` is what one fragment file declares. It carries the
//! resolved settings used for comparisons and a `JobBuilder` that turns those
//! settings into a runnable `JobSpec` once the lifecycle manager asks for it.

use std::fmt;
use std::path::PathBuf;

use crate::domain::job::{CommonInputConfig, ConfigError, HttpInputConfig};

/// Finalizer for the typed job settings
pub type ConfigFinalizer =
    Box<dyn Fn(HttpInputConfig) -> Result<HttpInputConfig, ConfigError> + Send + Sync>;

/// Finalizer for the settings shared by all inputs
pub type CommonFinalizer =
    Box<dyn Fn(CommonInputConfig) -> Result<CommonInputConfig, ConfigError> + Send + Sync>;

/// Everything needed to run one job
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name: String,
    pub config: HttpInputConfig,
    pub common: CommonInputConfig,
}

/// Deferred factory for a job
///
/// Holds the decoded settings as they came out of the fragment plus the two
/// finalize hooks. Nothing is resolved until `resolve_config` or `build` runs.
pub struct JobBuilder {
    name: String,
    config: HttpInputConfig,
    common: CommonInputConfig,
    finalize_config: ConfigFinalizer,
    finalize_common: CommonFinalizer,
}

impl JobBuilder {
    /// Creates a builder whose hooks run the plain `prepare` steps
    pub fn new(name: impl Into<String>, config: HttpInputConfig, common: CommonInputConfig) -> Self {
        Self {
            name: name.into(),
            config,
            common,
            finalize_config: Box::new(HttpInputConfig::prepare),
            finalize_common: Box::new(CommonInputConfig::prepare),
        }
    }

    /// Replaces the typed-config finalizer
    pub fn with_config_finalizer<F>(mut self, finalize: F) -> Self
    where
        F: Fn(HttpInputConfig) -> Result<HttpInputConfig, ConfigError> + Send + Sync + 'static,
    {
        self.finalize_config = Box::new(finalize);
        self
    }

    /// Replaces the common-config finalizer
    pub fn with_common_finalizer<F>(mut self, finalize: F) -> Self
    where
        F: Fn(CommonInputConfig) -> Result<CommonInputConfig, ConfigError> + Send + Sync + 'static,
    {
        self.finalize_common = Box::new(finalize);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the typed-config finalizer on a copy of the decoded settings
    pub fn resolve_config(&self) -> Result<HttpInputConfig, ConfigError> {
        (self.finalize_config)(self.config.clone())
    }

    /// Runs the common-config finalizer on a copy of the decoded settings
    pub fn resolve_common(&self) -> Result<CommonInputConfig, ConfigError> {
        (self.finalize_common)(self.common.clone())
    }

    /// Resolves both halves into a runnable spec
    pub fn build(&self) -> Result<JobSpec, ConfigError> {
        Ok(JobSpec {
            name: self.name.clone(),
            config: self.resolve_config()?,
            common: self.resolve_common()?,
        })
    }
}

impl fmt::Debug for JobBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobBuilder")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("common", &self.common)
            .finish_non_exhaustive()
    }
}

/// A validated job as declared by one fragment file
#[derive(Debug)]
pub struct JobDeclaration {
    /// Name of the declaring section, the job's identity
    pub logical_name: String,
    /// Absolute path of the fragment file
    pub source_path: PathBuf,
    /// Fully resolved settings, used for change detection
    pub config: HttpInputConfig,
    pub builder: JobBuilder,
}

impl JobDeclaration {
    /// Creates a declaration, resolving the builder's typed settings up front
    pub fn new(source_path: PathBuf, builder: JobBuilder) -> Result<Self, ConfigError> {
        let config = builder.resolve_config()?;
        Ok(Self {
            logical_name: builder.name().to_string(),
            source_path,
            config,
            builder,
        })
    }
}
