//! Runner configuration
//!
//! Defines where job fragments live and how often the directory is
//! rescanned.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Directory scanned when none is configured
pub const DEFAULT_HTTP_DIR: &str = "http.d";

/// Seconds between two scans when none is configured
pub const DEFAULT_TICKER_INTERVAL: u64 = 300;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the tree holding the job fragments
    pub http_dir: PathBuf,

    /// How often the tree is rescanned
    pub ticker_interval: Duration,
}

impl Config {
    /// Creates a configuration, normalizing the directory path
    pub fn new(http_dir: impl AsRef<Path>, ticker_interval: Duration) -> Self {
        Self {
            http_dir: clean_path(http_dir.as_ref()),
            ticker_interval,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.http_dir.as_os_str().is_empty() {
            anyhow::bail!("http_dir cannot be empty");
        }

        if self.ticker_interval.is_zero() {
            anyhow::bail!("ticker_interval must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            DEFAULT_HTTP_DIR,
            Duration::from_secs(DEFAULT_TICKER_INTERVAL),
        )
    }
}

/// Lexically removes `.` components and resolves `..` against preceding names
fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match cleaned.components().next_back() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => cleaned.push(".."),
            },
            other => cleaned.push(other.as_os_str()),
        }
    }
    if cleaned.as_os_str().is_empty() && !path.as_os_str().is_empty() {
        cleaned.push(".");
    }
    cleaned
}
