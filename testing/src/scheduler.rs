//! Manually driven scheduler.
//!
//! Tasks are captured instead of timed. Tests inspect what was scheduled and
//! decide when (and whether) each task runs.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use exhibits_core::schedule::{DeferredTask, ScheduleError, TaskError, TaskKey, TaskScheduler};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct ManualState {
    waiting: BTreeMap<TaskKey, (Duration, DeferredTask)>,
    history: Vec<(TaskKey, Duration)>,
    cancelled: Vec<TaskKey>,
    rejecting: bool,
}

/// [`TaskScheduler`] whose tasks only run when a test asks.
#[derive(Clone, Debug, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a task is waiting under `key`.
    #[must_use]
    pub fn is_scheduled(&self, key: &TaskKey) -> bool {
        self.state.lock().unwrap().waiting.contains_key(key)
    }

    /// Delay requested for the task waiting under `key`.
    #[must_use]
    pub fn delay_of(&self, key: &TaskKey) -> Option<Duration> {
        self.state.lock().unwrap().waiting.get(key).map(|(delay, _)| *delay)
    }

    /// Keys of waiting tasks.
    #[must_use]
    pub fn scheduled_keys(&self) -> Vec<TaskKey> {
        self.state.lock().unwrap().waiting.keys().cloned().collect()
    }

    /// Every `schedule` call accepted so far.
    #[must_use]
    pub fn history(&self) -> Vec<(TaskKey, Duration)> {
        self.state.lock().unwrap().history.clone()
    }

    /// Keys for which a waiting task was cancelled.
    #[must_use]
    pub fn cancelled(&self) -> Vec<TaskKey> {
        self.state.lock().unwrap().cancelled.clone()
    }

    /// Reject new tasks as if shutting down.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.state.lock().unwrap().rejecting = rejecting;
    }

    /// Run the task waiting under `key` once and forget it.
    ///
    /// Returns `None` when nothing is waiting under that key.
    pub async fn run(&self, key: &TaskKey) -> Option<Result<(), TaskError>> {
        let task = self.state.lock().unwrap().waiting.remove(key).map(|(_, task)| task)?;
        Some(task.run().await)
    }

    /// Run every waiting task once, in key order.
    pub async fn run_all(&self) -> Vec<(TaskKey, Result<(), TaskError>)> {
        let waiting = std::mem::take(&mut self.state.lock().unwrap().waiting);
        let mut results = Vec::with_capacity(waiting.len());
        for (key, (_, task)) in waiting {
            let result = task.run().await;
            results.push((key, result));
        }
        results
    }
}

impl TaskScheduler for ManualScheduler {
    fn schedule(&self, key: TaskKey, delay: Duration, task: DeferredTask) -> Result<(), ScheduleError> {
        let mut state = self.state.lock().unwrap();
        if state.rejecting {
            return Err(ScheduleError::ShuttingDown);
        }
        state.history.push((key.clone(), delay));
        state.waiting.insert(key, (delay, task));
        Ok(())
    }

    fn cancel(&self, key: &TaskKey) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.waiting.remove(key).is_some() {
            state.cancelled.push(key.clone());
            true
        } else {
            false
        }
    }

    fn pending(&self) -> usize {
        self.state.lock().unwrap().waiting.len()
    }
}
