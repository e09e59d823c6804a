//! Keyed delayed task queue.
//!
//! [`DelayedTaskQueue`] is the production [`TaskScheduler`]. Each task waits
//! out its delay in a spawned tokio task, then runs with the configured
//! [`RetryPolicy`]. Only [`TaskError::Transient`] failures are retried; work
//! that exhausts its retries lands in a bounded [`DeadLetterQueue`] instead of
//! being reported to whoever scheduled it. A [`TaskError::Permanent`] failure
//! is logged and counted, then dropped.
//!
//! # Keys
//!
//! At most one task is registered per [`TaskKey`] until it finishes.
//! Scheduling a key again, or [`TaskScheduler::cancel`], aborts a task that is
//! still waiting. A task that is already running finishes its current attempt
//! and is not retried.
//!
//! # Shutdown
//!
//! [`DelayedTaskQueue::shutdown`] stops accepting new tasks and waits (up to a
//! timeout) for every scheduled or running task to finish.

use crate::dead_letter::DeadLetterQueue;
use crate::metrics::SchedulerMetrics;
use crate::retry::{RetryPolicy, retry_with_backoff_if};
use crate::{HealthCheck, SchedulerError};
use exhibits_core::schedule::{DeferredTask, ScheduleError, TaskError, TaskFuture, TaskKey, TaskScheduler};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Configuration for [`DelayedTaskQueue`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Retry policy applied when a task fails
    pub retry_policy: RetryPolicy,
    /// Maximum number of dead-lettered tasks kept
    pub dlq_max_size: usize,
}

impl SchedulerConfig {
    /// Set the retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the DLQ maximum size
    #[must_use]
    pub const fn with_dlq_max_size(mut self, max_size: usize) -> Self {
        self.dlq_max_size = max_size;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            retry_policy: RetryPolicy::default(),
            dlq_max_size: 1000,
        }
    }
}

/// A task that failed every attempt.
#[derive(Debug, Clone)]
pub struct FailedTask {
    /// Key the task was scheduled under
    pub key: TaskKey,
    /// The work itself, kept so it can be replayed
    pub task: DeferredTask,
}

const WAITING: u8 = 0;
const RUNNING: u8 = 1;
const CANCELLED: u8 = 2;

struct Waiting {
    generation: u64,
    state: Arc<AtomicU8>,
    handle: JoinHandle<()>,
}

impl Waiting {
    /// Abort the task while it waits, or stop its retries once it runs.
    fn cancel(self, key: &TaskKey, reason: &'static str) {
        match self.state.swap(CANCELLED, Ordering::SeqCst) {
            WAITING => self.handle.abort(),
            RUNNING => tracing::debug!(key = %key, "Task is running, no further attempts"),
            _ => return,
        }
        SchedulerMetrics::record_cancelled(reason);
        tracing::debug!(key = %key, reason, "Task cancelled");
    }
}

struct Inner {
    waiting: Mutex<HashMap<TaskKey, Waiting>>,
    next_generation: AtomicU64,
    in_flight: Arc<AtomicUsize>,
    shutdown: AtomicBool,
    config: SchedulerConfig,
    dlq: DeadLetterQueue<FailedTask>,
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        let remaining = self.0.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        SchedulerMetrics::record_pending(remaining);
    }
}

/// Tokio-backed keyed delayed task queue.
#[derive(Clone)]
pub struct DelayedTaskQueue {
    inner: Arc<Inner>,
}

impl DelayedTaskQueue {
    /// Create a queue with the given configuration.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        let dlq = DeadLetterQueue::new(config.dlq_max_size);
        Self {
            inner: Arc::new(Inner {
                waiting: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                in_flight: Arc::new(AtomicUsize::new(0)),
                shutdown: AtomicBool::new(false),
                config,
                dlq,
            }),
        }
    }

    /// Access the dead letter queue.
    #[must_use]
    pub fn dlq(&self) -> DeadLetterQueue<FailedTask> {
        self.inner.dlq.clone()
    }

    /// Reschedule every dead-lettered task to run immediately.
    ///
    /// Returns the number of tasks resubmitted.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::ShuttingDown`] once shutdown has begun; the
    /// dead letter queue is left untouched in that case.
    pub fn replay_dead_letters(&self) -> Result<usize, ScheduleError> {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(ScheduleError::ShuttingDown);
        }
        let entries = self.inner.dlq.drain();
        let count = entries.len();
        for entry in entries {
            let FailedTask { key, task } = entry.payload;
            self.schedule(key, Duration::ZERO, task)?;
        }
        Ok(count)
    }

    /// Health of the queue, derived from dead letter queue usage.
    ///
    /// Degraded above 50% capacity, unhealthy when full.
    #[must_use]
    pub fn health(&self) -> HealthCheck {
        let dlq_size = self.inner.dlq.len();
        let dlq_capacity = self.inner.dlq.max_size();
        #[allow(clippy::cast_precision_loss)]
        let dlq_usage = (dlq_size as f64 / dlq_capacity as f64) * 100.0;

        let check = if self.inner.shutdown.load(Ordering::Acquire) {
            HealthCheck::unhealthy("scheduler", "Scheduler is shutting down")
        } else if dlq_size >= dlq_capacity {
            HealthCheck::unhealthy("scheduler", "Dead letter queue is full")
        } else if dlq_usage > 50.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let usage_pct = dlq_usage as u32;
            HealthCheck::degraded("scheduler", format!("Dead letter queue is {usage_pct}% full"))
        } else {
            HealthCheck::healthy("scheduler")
        };

        check
            .with_metadata("pending", self.pending().to_string())
            .with_metadata("dlq_size", dlq_size.to_string())
            .with_metadata("dlq_capacity", dlq_capacity.to_string())
    }

    /// Stop accepting tasks and wait for scheduled and running ones.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ShutdownTimeout`] with the number of tasks
    /// still outstanding when `timeout` elapses first.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), SchedulerError> {
        tracing::info!("Initiating scheduler shutdown");
        self.inner.shutdown.store(true, Ordering::Release);

        let start = tokio::time::Instant::now();
        let poll_interval = Duration::from_millis(100);

        loop {
            let pending = self.pending();
            if pending == 0 {
                tracing::info!("All deferred tasks completed, shutdown successful");
                return Ok(());
            }

            if start.elapsed() >= timeout {
                tracing::error!(pending, "Shutdown timeout: deferred tasks still outstanding");
                return Err(SchedulerError::ShutdownTimeout(pending));
            }

            tracing::debug!(pending, elapsed_ms = start.elapsed().as_millis(), "Waiting for deferred tasks");
            tokio::time::sleep(poll_interval).await;
        }
    }

    fn detach(inner: &Inner, key: &TaskKey, generation: u64) {
        let mut waiting = inner.waiting.lock().unwrap_or_else(PoisonError::into_inner);
        if waiting.get(key).is_some_and(|w| w.generation == generation) {
            waiting.remove(key);
        }
    }

    async fn execute(
        inner: Arc<Inner>,
        key: TaskKey,
        delay: Duration,
        generation: u64,
        state: Arc<AtomicU8>,
        task: DeferredTask,
    ) {
        tokio::time::sleep(delay).await;
        if state
            .compare_exchange(WAITING, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        tracing::debug!("Deferred task fired");
        let attempt = || -> TaskFuture {
            if state.load(Ordering::SeqCst) == CANCELLED {
                Box::pin(async { Err(TaskError::Cancelled) })
            } else {
                task.run()
            }
        };
        let result = retry_with_backoff_if(&inner.config.retry_policy, attempt, TaskError::is_transient).await;
        Self::detach(&inner, &key, generation);

        let exhausted = match result {
            Ok(()) => {
                SchedulerMetrics::record_completed();
                tracing::debug!("Deferred task completed");
                return;
            }
            Err(exhausted) => exhausted,
        };
        match exhausted.last_error {
            TaskError::Cancelled => {
                tracing::debug!(attempts = exhausted.attempts.saturating_sub(1), "Deferred task stopped after cancellation");
            }
            TaskError::Permanent(reason) => {
                SchedulerMetrics::record_rejected();
                tracing::warn!(reason = %reason, "Deferred task failed permanently, dropping it");
            }
            TaskError::Transient(reason) => {
                SchedulerMetrics::record_failed();
                tracing::error!(
                    attempts = exhausted.attempts,
                    error = %reason,
                    "Deferred task failed, moving to dead letter queue"
                );
                inner.dlq.push(FailedTask { key, task }, reason, exhausted.attempts);
            }
        }
    }
}

impl TaskScheduler for DelayedTaskQueue {
    fn schedule(&self, key: TaskKey, delay: Duration, task: DeferredTask) -> Result<(), ScheduleError> {
        if self.inner.shutdown.load(Ordering::Acquire) {
            tracing::warn!(key = %key, "Rejecting task, scheduler is shutting down");
            return Err(ScheduleError::ShuttingDown);
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
        let pending = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let guard = AtomicCounterGuard(Arc::clone(&self.inner.in_flight));
        SchedulerMetrics::record_scheduled(pending);

        // The map lock is held across spawn and insert so a zero-delay task
        // cannot detach itself before its entry exists.
        let mut waiting = self.inner.waiting.lock().unwrap_or_else(PoisonError::into_inner);

        let inner = Arc::clone(&self.inner);
        let state = Arc::new(AtomicU8::new(WAITING));
        let span = tracing::info_span!("deferred_task", key = %key, delay_ms = delay.as_millis());
        let task_key = key.clone();
        let task_state = Arc::clone(&state);
        let handle = tokio::spawn(
            async move {
                let _guard = guard;
                Self::execute(inner, task_key, delay, generation, task_state, task).await;
            }
            .instrument(span),
        );

        let entry = Waiting {
            generation,
            state,
            handle,
        };
        if let Some(previous) = waiting.insert(key.clone(), entry) {
            previous.cancel(&key, "superseded");
        }

        Ok(())
    }

    fn cancel(&self, key: &TaskKey) -> bool {
        let removed = self
            .inner
            .waiting
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);

        match removed {
            Some(waiting) => {
                waiting.cancel(key, "cancelled");
                true
            }
            None => false,
        }
    }

    fn pending(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }
}
