//! Test helpers shared by the scheduler tests

use httpdir_core::JobBuilder;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use crate::service::{JobHandle, LifecycleError, LifecycleManager};

/// A lifecycle call as seen by the recording manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Add(String),
    Remove(String),
}

/// Lifecycle manager that records calls instead of running workers
#[derive(Default)]
pub struct RecordingManager {
    calls: Mutex<Vec<Call>>,
    live: Mutex<HashSet<String>>,
    failing_adds: Mutex<HashSet<String>>,
    failing_removes: Mutex<HashSet<String>>,
}

impl RecordingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `add_job` for `name` fail
    pub fn fail_add(&self, name: &str) {
        self.failing_adds.lock().unwrap().insert(name.to_string());
    }

    /// Makes every `remove_job` for `name` fail
    pub fn fail_remove(&self, name: &str) {
        self.failing_removes.lock().unwrap().insert(name.to_string());
    }

    pub fn heal(&self) {
        self.failing_adds.lock().unwrap().clear();
        self.failing_removes.lock().unwrap().clear();
    }

    /// Returns and clears the recorded calls
    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn live(&self) -> usize {
        self.live.lock().unwrap().len()
    }
}

impl LifecycleManager for RecordingManager {
    fn add_job(&self, builder: &JobBuilder) -> Result<JobHandle, LifecycleError> {
        let name = builder.name().to_string();
        self.calls.lock().unwrap().push(Call::Add(name.clone()));

        if self.failing_adds.lock().unwrap().contains(&name) {
            return Err(LifecycleError::NameCollision(name));
        }
        if !self.live.lock().unwrap().insert(name.clone()) {
            return Err(LifecycleError::NameCollision(name));
        }
        Ok(JobHandle::new(name))
    }

    fn remove_job(&self, handle: &JobHandle) -> Result<(), LifecycleError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Remove(handle.name.clone()));

        if self.failing_removes.lock().unwrap().contains(&handle.name) {
            return Err(LifecycleError::UnknownHandle {
                name: handle.name.clone(),
                id: handle.id,
            });
        }
        self.live.lock().unwrap().remove(&handle.name);
        Ok(())
    }
}

/// Writes a job fragment declaring `name`
pub fn write_job(dir: &Path, file: &str, name: &str, body: &str) {
    let path = dir.join(file);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let source = format!(
        "[{name}]\ntype = \"HttpInput\"\nurl = \"http://localhost/{name}\"\n{body}\n"
    );
    std::fs::write(path, source).unwrap();
}
