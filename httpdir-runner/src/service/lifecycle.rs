//! Lifecycle service
//!
//! Starts and stops the workers behind declared jobs. The reconciler only
//! ever talks to a `LifecycleManager`; it never touches a worker itself.

use httpdir_core::{ConfigError, JobBuilder};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::service::poller::HttpPoller;

/// Reference to a live worker, valid until it is removed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub id: Uuid,
    pub name: String,
}

impl JobHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// Errors raised while starting or stopping a worker
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("a job named '{0}' is already registered")]
    NameCollision(String),

    #[error("no live job '{name}' with id {id}")]
    UnknownHandle { name: String, id: Uuid },

    #[error("building job '{name}': {source}")]
    Build {
        name: String,
        #[source]
        source: ConfigError,
    },
}

/// Service trait for managing live workers
pub trait LifecycleManager: Send + Sync {
    /// Builds and starts a worker
    ///
    /// # Returns
    /// A handle identifying the worker, or an error if the job cannot be
    /// built or its name is already taken
    fn add_job(&self, builder: &JobBuilder) -> Result<JobHandle, LifecycleError>;

    /// Stops a worker previously started by `add_job`
    fn remove_job(&self, handle: &JobHandle) -> Result<(), LifecycleError>;
}

/// Runs every job as its own tokio task
///
/// Must be used from within a tokio runtime.
pub struct TaskLifecycleManager {
    client: reqwest::Client,
    tasks: Mutex<HashMap<String, (Uuid, JoinHandle<()>)>>,
}

impl TaskLifecycleManager {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Creates a manager whose workers share a configured HTTP client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Number of registered jobs
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Aborts every remaining worker
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for (name, (_, task)) in tasks.drain() {
            debug!("Aborting job '{}'", name);
            task.abort();
        }
        info!("All jobs stopped");
    }
}

impl Default for TaskLifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleManager for TaskLifecycleManager {
    fn add_job(&self, builder: &JobBuilder) -> Result<JobHandle, LifecycleError> {
        let spec = builder.build().map_err(|source| LifecycleError::Build {
            name: builder.name().to_string(),
            source,
        })?;

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if tasks.contains_key(&spec.name) {
            return Err(LifecycleError::NameCollision(spec.name));
        }

        let handle = JobHandle::new(spec.name.clone());
        let poller = HttpPoller::new(spec, self.client.clone());
        let task = tokio::spawn(poller.run());
        tasks.insert(handle.name.clone(), (handle.id, task));

        Ok(handle)
    }

    fn remove_job(&self, handle: &JobHandle) -> Result<(), LifecycleError> {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        match tasks.get(&handle.name) {
            Some((id, _)) if *id == handle.id => {}
            _ => {
                return Err(LifecycleError::UnknownHandle {
                    name: handle.name.clone(),
                    id: handle.id,
                });
            }
        }

        if let Some((_, task)) = tasks.remove(&handle.name) {
            task.abort();
        }
        Ok(())
    }
}
