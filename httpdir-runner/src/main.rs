//! Httpdir Runner
//!
//! Keeps a set of HTTP polling jobs in line with the job fragments found
//! under a directory tree.
//!
//! Architecture:
//! - Configuration: Load settings from the command line or environment
//! - Scanner: Walk the tree and parse every fragment into a declaration
//! - Scheduler: Reconcile declared jobs against running jobs on every tick
//! - Services: Start and stop the workers that poll the endpoints
//!
//! The runner never reacts to filesystem notifications; changes are picked
//! up on the next scheduled scan.

mod config;
mod scanner;
mod scheduler;
mod service;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, DEFAULT_HTTP_DIR, DEFAULT_TICKER_INTERVAL};
use crate::scanner::DirectoryScanner;
use crate::scheduler::DirectoryInput;
use crate::service::TaskLifecycleManager;

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "httpdir=info";

#[derive(Parser)]
#[command(name = "httpdir")]
#[command(about = "Runs the HTTP polling jobs declared in a directory tree", long_about = None)]
struct Cli {
    /// Root of the tree holding the job fragments
    #[arg(long, env = "HTTPDIR_DIR", default_value = DEFAULT_HTTP_DIR)]
    http_dir: PathBuf,

    /// Seconds between two scans of the tree
    #[arg(long, env = "HTTPDIR_TICKER_INTERVAL", default_value_t = DEFAULT_TICKER_INTERVAL)]
    ticker_interval: u64,

    /// Scan once, report declarations and duplicates, start nothing
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::new(&cli.http_dir, Duration::from_secs(cli.ticker_interval));
    config.validate()?;

    if cli.check {
        return check(&config.http_dir);
    }

    info!("Starting httpdir runner");
    info!(
        "Loaded configuration: http_dir={}, ticker_interval={:?}",
        config.http_dir.display(),
        config.ticker_interval
    );

    let manager = Arc::new(TaskLifecycleManager::new());
    let mut input = DirectoryInput::new(&config, manager.clone());

    let stop = input.stop_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received interrupt, stopping"),
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
        stop.stop();
    });

    let result = input.run().await;

    info!("Stopping {} job(s)", input.running().len());
    manager.shutdown();

    result.context("Directory input failed")
}

/// Validates a fragment tree without starting anything
fn check(root: &Path) -> Result<()> {
    let declared = DirectoryScanner::new(root)
        .scan()
        .context("Failed to scan job directory")?;

    let mut by_name: BTreeMap<&str, Vec<&Path>> = BTreeMap::new();
    for (path, declaration) in &declared {
        by_name
            .entry(declaration.logical_name.as_str())
            .or_default()
            .push(path.as_path());
    }

    for (name, paths) in &by_name {
        for path in paths {
            println!("{}\t{}", name, path.display());
        }
    }

    let duplicates: Vec<(&str, usize)> = by_name
        .iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|(name, paths)| (*name, paths.len()))
        .collect();
    for (name, count) in &duplicates {
        warn!("'{}' is declared by {} files", name, count);
    }

    if !duplicates.is_empty() {
        anyhow::bail!("{} duplicated job name(s)", duplicates.len());
    }

    info!("{} job(s) declared", declared.len());
    Ok(())
}
