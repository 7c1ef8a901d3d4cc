//! Directory input
//!
//! The control loop that keeps the running jobs in line with the fragment
//! tree. It reconciles once on start, then again on every tick, until a stop
//! signal arrives. Only one pass is ever in flight: passes run inline in the
//! loop, one per iteration.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::scanner::DirectoryScanner;
use crate::scheduler::reconciler::{PassReport, ReconcileError, Reconciler, RunningSet};
use crate::service::LifecycleManager;

/// Where the loop is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// Cloneable trigger for stopping a `DirectoryInput`
///
/// Stopping is one-shot and idempotent.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

/// Periodic scanner and reconciler of a fragment directory
pub struct DirectoryInput {
    scanner: DirectoryScanner,
    reconciler: Reconciler,
    ticker_interval: time::Duration,
    stop_tx: Arc<watch::Sender<bool>>,
    state: LoopState,
}

impl DirectoryInput {
    pub fn new(config: &Config, manager: Arc<dyn LifecycleManager>) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            scanner: DirectoryScanner::new(&config.http_dir),
            reconciler: Reconciler::new(manager),
            ticker_interval: config.ticker_interval,
            stop_tx: Arc::new(stop_tx),
            state: LoopState::Idle,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Requests the loop to stop after the current pass
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    /// Stops the loop ahead of a restart, same as `stop`
    #[allow(dead_code)]
    pub fn cleanup_for_restart(&self) {
        self.stop();
    }

    #[allow(dead_code)]
    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn running(&self) -> &RunningSet {
        self.reconciler.running()
    }

    /// Scans the tree and reconciles once
    ///
    /// A fatal scan error leaves the running set untouched.
    pub fn load_inputs(&mut self) -> Result<PassReport, ReconcileError> {
        let declared = self.scanner.scan()?;
        let report = self.reconciler.reconcile(declared)?;

        if report.is_noop() {
            debug!("No changes in {}", self.scanner.root().display());
        } else {
            info!(
                "Reconciled {}: {} added, {} removed, {} unchanged, {} failed",
                self.scanner.root().display(),
                report.added.len(),
                report.removed.len(),
                report.unchanged.len(),
                report.failed.len()
            );
        }
        if !report.duplicates.is_empty() {
            error!("{} duplicate declaration(s) rejected", report.duplicates.len());
        }
        Ok(report)
    }

    /// Runs the loop until stopped or until a pass fails fatally
    ///
    /// Jobs still running when the loop ends are left to the lifecycle
    /// manager.
    pub async fn run(&mut self) -> Result<(), ReconcileError> {
        self.state = LoopState::Running;
        info!(
            "Watching {} (interval: {:?})",
            self.scanner.root().display(),
            self.ticker_interval
        );

        let result = self.run_loop().await;
        if let Err(e) = &result {
            error!(error = ?e, "Directory input stopped");
        }
        self.state = LoopState::Stopped;
        result
    }

    async fn run_loop(&mut self) -> Result<(), ReconcileError> {
        let mut stop_rx = self.stop_tx.subscribe();
        self.load_inputs()?;

        let mut ticker = time::interval_at(
            Instant::now() + self.ticker_interval,
            self.ticker_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *stop_rx.borrow_and_update() {
                info!("Stop requested");
                return Ok(());
            }

            tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
                _ = ticker.tick() => {
                    self.load_inputs()?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingManager, write_job};
    use std::time::Duration;

    fn input(dir: &std::path::Path, manager: Arc<RecordingManager>) -> DirectoryInput {
        let config = Config::new(dir, Duration::from_millis(20));
        DirectoryInput::new(&config, manager)
    }

    #[tokio::test]
    async fn test_initial_pass_then_stop() {
        let dir = tempfile::tempdir().unwrap();
        write_job(dir.path(), "a.toml", "A", "");
        let manager = Arc::new(RecordingManager::new());
        let mut input = input(dir.path(), manager.clone());
        assert_eq!(input.state(), LoopState::Idle);

        // Stop before running still performs the initial pass
        input.stop();
        input.run().await.unwrap();

        assert_eq!(input.state(), LoopState::Stopped);
        assert!(input.running().contains_key("A"));
        assert_eq!(manager.take_calls(), vec![Call::Add("A".into())]);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut input = input(dir.path(), Arc::new(RecordingManager::new()));

        let handle = input.stop_handle();
        handle.stop();
        handle.stop();
        input.cleanup_for_restart();

        input.run().await.unwrap();
        assert_eq!(input.state(), LoopState::Stopped);
    }

    #[tokio::test]
    async fn test_ticks_pick_up_changes() {
        let dir = tempfile::tempdir().unwrap();
        write_job(dir.path(), "a.toml", "A", "");
        let manager = Arc::new(RecordingManager::new());
        let mut input = input(dir.path(), manager.clone());
        let stop = input.stop_handle();

        let task = tokio::spawn(async move {
            let result = input.run().await;
            (input, result)
        });

        time::sleep(Duration::from_millis(100)).await;
        write_job(dir.path(), "b.toml", "B", "");
        time::sleep(Duration::from_millis(200)).await;
        stop.stop();

        let (input, result) = task.await.unwrap();
        result.unwrap();
        assert!(input.running().contains_key("A"));
        assert!(input.running().contains_key("B"));

        // Unchanged ticks made no extra calls
        assert_eq!(
            manager.take_calls(),
            vec![Call::Add("A".into()), Call::Add("B".into())]
        );
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(RecordingManager::new());
        let mut input = input(&dir.path().join("missing"), manager.clone());

        let err = input.run().await.unwrap_err();
        assert!(matches!(err, ReconcileError::Scan(_)));
        assert_eq!(input.state(), LoopState::Stopped);
        assert!(input.running().is_empty());
        assert!(manager.take_calls().is_empty());
    }

    #[tokio::test]
    async fn test_root_removed_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("http.d");
        write_job(&root, "a.toml", "A", "");
        let manager = Arc::new(RecordingManager::new());
        let mut input = input(&root, manager.clone());

        let task = tokio::spawn(async move {
            let result = input.run().await;
            (input, result)
        });

        time::sleep(Duration::from_millis(60)).await;
        std::fs::remove_dir_all(&root).unwrap();

        let (input, result) = time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(ReconcileError::Scan(_))));
        assert_eq!(input.state(), LoopState::Stopped);
        // The failed pass left the running job alone
        assert!(input.running().contains_key("A"));
        assert_eq!(manager.take_calls(), vec![Call::Add("A".into())]);
    }
}
