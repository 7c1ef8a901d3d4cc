//! Job domain types
//!
//! `HttpInputConfig` holds the typed settings of one polling job and
//! `CommonInputConfig` the fields shared by every input-style job. Both are
//! decoded from a fragment section and then resolved by their `prepare`
//! step before anything compares or runs them.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use super::severity::Severity;

/// HTTP methods a polling job may use
pub const SUPPORTED_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "HEAD", "PATCH", "OPTIONS"];

/// Initial delay of the retry policy injected into every directory job
pub const DIRECTORY_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Delay ceiling of the retry policy injected into every directory job
pub const DIRECTORY_RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Invalid typed settings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("at least one of 'url' or 'urls' must be set")]
    MissingUrl,

    #[error("unsupported HTTP method '{0}'")]
    UnsupportedMethod(String),

    #[error("ticker_interval must be greater than 0")]
    ZeroInterval,

    #[error("retry max_delay ({max_delay:?}) is shorter than delay ({delay:?})")]
    InvalidRetry { delay: Duration, max_delay: Duration },
}

/// A single request header
///
/// Headers are kept as an ordered list, order is part of a job's identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Typed settings of an HTTP polling job
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpInputConfig {
    /// Single target endpoint, folded into `urls` by `prepare`
    pub url: String,
    /// Target endpoints, polled in order
    pub urls: Vec<String>,
    pub method: String,
    pub headers: Vec<Header>,
    pub body: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Seconds between two polls
    pub ticker_interval: u64,
    pub success_severity: Severity,
    pub error_severity: Severity,
}

impl Default for HttpInputConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            urls: Vec::new(),
            method: "GET".to_string(),
            headers: Vec::new(),
            body: String::new(),
            username: None,
            password: None,
            ticker_interval: 10,
            success_severity: Severity::INFO,
            error_severity: Severity::ALERT,
        }
    }
}

impl HttpInputConfig {
    /// Resolves defaults and validates the settings
    ///
    /// `url` is moved to the front of `urls`, the method is upper-cased and
    /// checked, and a username without a password gets an empty password.
    /// Preparing an already prepared config returns it unchanged.
    pub fn prepare(mut self) -> Result<Self, ConfigError> {
        if !self.url.is_empty() {
            let url = std::mem::take(&mut self.url);
            self.urls.insert(0, url);
        }
        if self.urls.is_empty() {
            return Err(ConfigError::MissingUrl);
        }

        self.method = self.method.trim().to_ascii_uppercase();
        if !SUPPORTED_METHODS.contains(&self.method.as_str()) {
            return Err(ConfigError::UnsupportedMethod(self.method));
        }

        if self.ticker_interval == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        if self.username.is_some() && self.password.is_none() {
            self.password = Some(String::new());
        }

        Ok(self)
    }

    /// Poll interval as a duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.ticker_interval)
    }

    /// Field-by-field structural comparison
    ///
    /// List fields compare by length and then element by element, so two
    /// configs holding the same headers in a different order differ.
    pub fn same_settings(&self, other: &HttpInputConfig) -> bool {
        if self.url != other.url {
            return false;
        }
        if self.urls.len() != other.urls.len() {
            return false;
        }
        for (i, url) in self.urls.iter().enumerate() {
            if other.urls[i] != *url {
                return false;
            }
        }
        if self.method != other.method {
            return false;
        }
        if self.headers.len() != other.headers.len() {
            return false;
        }
        for (i, header) in self.headers.iter().enumerate() {
            if other.headers[i] != *header {
                return false;
            }
        }
        if self.body != other.body {
            return false;
        }
        if self.username != other.username {
            return false;
        }
        if self.password != other.password {
            return false;
        }
        if self.ticker_interval != other.ticker_interval {
            return false;
        }
        if self.success_severity != other.success_severity {
            return false;
        }
        self.error_severity == other.error_severity
    }
}

/// Retry policy applied when a job's request fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOptions {
    pub delay: Duration,
    pub max_delay: Duration,
    /// `None` retries forever
    pub max_retries: Option<u32>,
}

impl Default for RetryOptions {
    /// Host default: give up on the first failure
    fn default() -> Self {
        Self {
            delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_retries: Some(0),
        }
    }
}

impl RetryOptions {
    /// The fixed policy every directory job runs with
    pub fn directory_default() -> Self {
        Self {
            delay: DIRECTORY_RETRY_DELAY,
            max_delay: DIRECTORY_RETRY_MAX_DELAY,
            max_retries: None,
        }
    }

    /// Delay before retry number `attempt` (0-based), doubling up to `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Whether `attempts` failed retries use up the policy
    pub fn exhausted(&self, attempts: u32) -> bool {
        match self.max_retries {
            Some(max) => attempts >= max,
            None => false,
        }
    }
}

/// Settings shared by every input-style job
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CommonInputConfig {
    /// Whether the job may stop on its own without taking the host down
    pub can_exit: Option<bool>,
    /// Not read from fragments, always set by `apply_defaults`
    #[serde(skip)]
    pub retries: RetryOptions,
}

impl CommonInputConfig {
    /// Host-side preparation of the common fields
    pub fn prepare(self) -> Result<Self, ConfigError> {
        let RetryOptions {
            delay, max_delay, ..
        } = self.retries;
        if max_delay < delay {
            return Err(ConfigError::InvalidRetry { delay, max_delay });
        }
        Ok(self)
    }

    /// Overlays the settings the directory manages for its jobs
    ///
    /// The retry policy is always replaced, `can_exit` only defaults to true.
    pub fn apply_defaults(mut self) -> Self {
        self.retries = RetryOptions::directory_default();
        if self.can_exit.is_none() {
            self.can_exit = Some(true);
        }
        self
    }

    pub fn can_exit(&self) -> bool {
        self.can_exit.unwrap_or(false)
    }
}
