//! Delayed task scheduling abstraction.
//!
//! Deferred work (delayed republication) is described as a keyed, re-runnable
//! [`DeferredTask`] and handed to a [`TaskScheduler`]. Keys give tasks an
//! identity so a newer schedule supersedes an older one and a pending task can
//! be cancelled before it fires.

use crate::record::{RecordId, RecordKind};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Boxed future produced by one run of a [`DeferredTask`].
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send>>;

/// Why one run of a [`DeferredTask`] failed.
///
/// Only transient failures are worth another attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// A dependency failed; the same work may succeed later.
    #[error("{0}")]
    Transient(String),

    /// The work can never succeed as scheduled (missing record, unmet
    /// precondition). Dropped without retry.
    #[error("{0}")]
    Permanent(String),

    /// The task was cancelled or superseded between attempts.
    #[error("Task cancelled")]
    Cancelled,
}

impl TaskError {
    /// Whether another attempt may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Identity of a scheduled task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey(String);

impl TaskKey {
    /// Wrap an arbitrary key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key of the delayed republication of one record: `republish:<kind>:<uuid>`.
    #[must_use]
    pub fn republish(kind: RecordKind, record_id: &RecordId) -> Self {
        Self(format!("republish:{kind}:{record_id}"))
    }

    /// Borrow the raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Re-runnable unit of deferred work.
///
/// Each call to [`DeferredTask::run`] produces a fresh future, so a scheduler
/// can retry a failed attempt.
#[derive(Clone)]
pub struct DeferredTask {
    run: Arc<dyn Fn() -> TaskFuture + Send + Sync>,
}

impl DeferredTask {
    /// Wrap an async closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        Self {
            run: Arc::new(move || Box::pin(f())),
        }
    }

    /// Start one attempt.
    #[must_use]
    pub fn run(&self) -> TaskFuture {
        (self.run)()
    }
}

impl fmt::Debug for DeferredTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredTask").finish_non_exhaustive()
    }
}

/// Errors returned when a task cannot be scheduled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The scheduler is shutting down and accepts no new work.
    #[error("Scheduler is shutting down")]
    ShuttingDown,
}

/// Keyed delayed execution.
pub trait TaskScheduler: Send + Sync {
    /// Run `task` after `delay`. A pending task with the same key is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::ShuttingDown`] once shutdown has begun.
    fn schedule(&self, key: TaskKey, delay: Duration, task: DeferredTask) -> Result<(), ScheduleError>;

    /// Cancel a task that has not finished. Returns `true` if one was found.
    ///
    /// A task that is already running finishes its current attempt but is
    /// not retried.
    fn cancel(&self, key: &TaskKey) -> bool;

    /// Number of tasks scheduled but not yet finished.
    fn pending(&self) -> usize;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_republish_key_format() {
        let key = TaskKey::republish(RecordKind::GridItem, &RecordId::new("abc"));
        assert_eq!(key.as_str(), "republish:grid_item:abc");
    }

    #[tokio::test]
    async fn test_deferred_task_can_run_repeatedly() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let task = DeferredTask::new(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        task.run().await.unwrap();
        task.clone().run().await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_only_transient_failures_are_retryable() {
        assert!(TaskError::Transient("index down".into()).is_transient());
        assert!(!TaskError::Permanent("exhibit unpublished".into()).is_transient());
        assert!(!TaskError::Cancelled.is_transient());
    }
}
