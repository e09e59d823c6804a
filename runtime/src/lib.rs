//! # Exhibits Runtime
//!
//! Runtime services for the exhibits lifecycle service.
//!
//! ## Core Components
//!
//! - **`DelayedTaskQueue`**: keyed, cancellable delayed execution of deferred work
//! - **`RetryPolicy`**: exponential backoff with jitter for transient failures
//! - **`DeadLetterQueue`**: bounded store of work that exhausted its retries
//! - **Health**: `HealthCheck` / `HealthReport` aggregation for readiness probes
//! - **Metrics**: Prometheus recorder and per-concern metric helpers
//!
//! ## Example
//!
//! ```
//! use exhibits_core::schedule::{DeferredTask, TaskKey, TaskScheduler};
//! use exhibits_runtime::{DelayedTaskQueue, SchedulerConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let queue = DelayedTaskQueue::new(SchedulerConfig::default());
//! queue
//!     .schedule(
//!         TaskKey::new("republish:item:42"),
//!         Duration::from_millis(10),
//!         DeferredTask::new(|| async { Ok(()) }),
//!     )
//!     .ok();
//! queue.shutdown(Duration::from_secs(1)).await.ok();
//! # }
//! ```

/// Retry logic with exponential backoff
pub mod retry;

/// Bounded dead letter queue
pub mod dead_letter;

/// Keyed delayed task queue
pub mod scheduler;

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur while operating the scheduler
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum SchedulerError {
        /// Shutdown timed out with tasks still outstanding
        #[error("Shutdown timeout: {0} deferred tasks still running")]
        ShutdownTimeout(usize),
    }
}

pub use dead_letter::{DeadLetter, DeadLetterQueue};
pub use error::SchedulerError;
pub use retry::{RetriesExhausted, RetryPolicy, retry_with_backoff, retry_with_backoff_if};
pub use scheduler::{DelayedTaskQueue, FailedTask, SchedulerConfig};

/// Health check status levels
///
/// Indicates the current health state of a component or system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthStatus {
    /// Component is fully operational
    Healthy,

    /// Component is operational but experiencing issues (e.g., high DLQ size)
    Degraded,

    /// Component is not operational
    Unhealthy,
}

impl HealthStatus {
    /// Check if status is healthy
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Check if status is degraded
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::Degraded)
    }

    /// Check if status is unhealthy
    #[must_use]
    pub const fn is_unhealthy(self) -> bool {
        matches!(self, Self::Unhealthy)
    }

    /// Get the worst status between two statuses
    #[must_use]
    pub const fn worst(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unhealthy, _) | (_, Self::Unhealthy) => Self::Unhealthy,
            (Self::Degraded, _) | (_, Self::Degraded) => Self::Degraded,
            _ => Self::Healthy,
        }
    }

    /// Lowercase name, as reported by health endpoints
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health check result for a component
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// Name of the component being checked
    pub component: String,

    /// Current health status
    pub status: HealthStatus,

    /// Optional message providing details
    pub message: Option<String>,

    /// Optional metadata (e.g., queue sizes)
    pub metadata: Vec<(String, String)>,
}

impl HealthCheck {
    /// Create a healthy check result
    #[must_use]
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Healthy,
            message: None,
            metadata: Vec::new(),
        }
    }

    /// Create a degraded check result
    #[must_use]
    pub fn degraded(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Degraded,
            message: Some(message.into()),
            metadata: Vec::new(),
        }
    }

    /// Create an unhealthy check result
    #[must_use]
    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            metadata: Vec::new(),
        }
    }

    /// Add metadata to the health check
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }
}

/// Aggregated health report
///
/// Combines multiple health checks into an overall system status.
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Overall system status (worst of all checks)
    pub status: HealthStatus,

    /// Individual component checks
    pub checks: Vec<HealthCheck>,

    /// Timestamp when report was generated
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    /// Create a new health report from checks
    #[must_use]
    pub fn new(checks: Vec<HealthCheck>) -> Self {
        let status = checks
            .iter()
            .map(|c| c.status)
            .fold(HealthStatus::Healthy, HealthStatus::worst);

        Self {
            status,
            checks,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Check if the overall system can serve traffic (healthy or degraded)
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        !self.status.is_unhealthy()
    }
}
