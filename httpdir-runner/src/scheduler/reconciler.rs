//! Reconciler
//!
//! Converges the set of running jobs towards the set declared on disk.
//!
//! A pass works in two steps:
//! 1. Stop every running job whose logical name is no longer declared.
//! 2. Walk the declared names in sorted order. A name declared by several
//!    files keeps only the last file (by path) and reports the others as
//!    duplicates. A running job with identical settings from the same file
//!    is left alone; anything else is stopped and started again.
//!
//! Workers are never updated in place. The running set is only touched
//! here, and only after the lifecycle manager accepted the change.

use httpdir_core::JobDeclaration;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::scanner::{DeclaredSet, ScanError};
use crate::service::{JobHandle, LifecycleError, LifecycleManager};

/// A job the lifecycle manager is currently running
#[derive(Debug)]
pub struct RunningJob {
    /// Declaration the worker was last started from
    pub declaration: JobDeclaration,
    pub handle: JobHandle,
}

impl RunningJob {
    pub fn source_path(&self) -> &Path {
        &self.declaration.source_path
    }
}

/// Running jobs keyed by logical name
pub type RunningSet = BTreeMap<String, RunningJob>;

/// Errors reported by a reconciliation pass
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Another file already declares this logical name
    #[error(
        "Duplicate Name: Input with name [{name}] already exists. Not loading input file: {}",
        path.display()
    )]
    DuplicateName { name: String, path: PathBuf },

    /// The fragment tree could not be scanned at all
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A running job could not be stopped
    #[error("removing '{name}': {source}")]
    Remove {
        name: String,
        #[source]
        source: LifecycleError,
    },
}

/// What one pass changed
#[derive(Debug, Default)]
pub struct PassReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
    /// Every `DuplicateName` found during the pass
    pub duplicates: Vec<ReconcileError>,
    /// Jobs that could not be started, retried on the next pass
    pub failed: Vec<(String, LifecycleError)>,
}

impl PassReport {
    /// Whether the pass made no lifecycle calls
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.failed.is_empty()
    }
}

/// Owner of the running set
pub struct Reconciler {
    manager: Arc<dyn LifecycleManager>,
    running: RunningSet,
}

impl Reconciler {
    pub fn new(manager: Arc<dyn LifecycleManager>) -> Self {
        Self {
            manager,
            running: RunningSet::new(),
        }
    }

    pub fn running(&self) -> &RunningSet {
        &self.running
    }

    /// Applies one declared set
    ///
    /// # Errors
    /// Fails only when a running job cannot be stopped. The job then stays
    /// in the running set and the rest of the pass is skipped. Duplicates
    /// and start failures are collected in the report instead.
    pub fn reconcile(&mut self, declared: DeclaredSet) -> Result<PassReport, ReconcileError> {
        let mut report = PassReport::default();
        let declared = group_by_name(declared);

        let stale: Vec<String> = self
            .running
            .keys()
            .filter(|name| !declared.contains_key(*name))
            .cloned()
            .collect();
        for name in stale {
            self.stop(&name)?;
            report.removed.push(name);
        }

        for (name, mut declarations) in declared {
            // Paths are sorted, the last one wins
            let Some(winner) = declarations.pop() else {
                continue;
            };
            for rejected in declarations {
                let duplicate = ReconcileError::DuplicateName {
                    name: name.clone(),
                    path: rejected.source_path,
                };
                error!("{}", duplicate);
                report.duplicates.push(duplicate);
            }

            if let Some(running) = self.running.get(&name) {
                if running.source_path() == winner.source_path
                    && running.declaration.config.same_settings(&winner.config)
                {
                    report.unchanged.push(name);
                    continue;
                }
                self.stop(&name)?;
                report.removed.push(name.clone());
            }

            self.start(name, winner, &mut report);
        }

        Ok(report)
    }

    /// Stops a running job and forgets it
    fn stop(&mut self, name: &str) -> Result<(), ReconcileError> {
        let Some(running) = self.running.get(name) else {
            return Ok(());
        };

        self.manager
            .remove_job(&running.handle)
            .map_err(|source| ReconcileError::Remove {
                name: name.to_string(),
                source,
            })?;
        self.running.remove(name);
        info!("Removed: {}", name);
        Ok(())
    }

    /// Starts a declared job, recording a failure instead of returning it
    fn start(&mut self, name: String, declaration: JobDeclaration, report: &mut PassReport) {
        match self.manager.add_job(&declaration.builder) {
            Ok(handle) => {
                self.running.insert(
                    name.clone(),
                    RunningJob {
                        declaration,
                        handle,
                    },
                );
                info!("Added: {}", name);
                report.added.push(name);
            }
            Err(e) => {
                error!("creating input '{}': {}", name, e);
                report.failed.push((name, e));
            }
        }
    }
}

/// Groups declarations by logical name, each group in path order
fn group_by_name(declared: DeclaredSet) -> BTreeMap<String, Vec<JobDeclaration>> {
    let mut groups: BTreeMap<String, Vec<JobDeclaration>> = BTreeMap::new();
    for declaration in declared.into_values() {
        groups
            .entry(declaration.logical_name.clone())
            .or_default()
            .push(declaration);
    }
    groups
}
