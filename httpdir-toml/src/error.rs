//! Error types for declaration parsing

use httpdir_core::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for parsing operations
pub type Result<T> = std::result::Result<T, DeclarationError>;

/// Reasons a fragment file does not yield a declaration
#[derive(Debug, Error)]
pub enum DeclarationError {
    /// The file could not be read
    #[error("reading '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// No section carries the job type tag
    #[error("No `{0}` section.")]
    MissingSection(&'static str),

    /// More than one section carries the job type tag
    #[error("multiple `{kind}` sections: {}", names.join(", "))]
    AmbiguousSection {
        kind: &'static str,
        names: Vec<String>,
    },

    /// The job section does not decode into typed settings
    #[error("section '{name}': {source}")]
    InvalidSection {
        name: String,
        #[source]
        source: toml::de::Error,
    },

    /// The typed settings were rejected by a finalizer
    #[error("prepping config: {0}")]
    Finalize(#[from] ConfigError),
}

impl DeclarationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
