//! Prometheus metrics for observability and monitoring.
//!
//! Metric collection for the lifecycle service:
//! - Lifecycle operations (create, update, publish, ...)
//! - Edit lock conflicts
//! - Search index calls
//! - Deferred task scheduling
//! - Retries and the dead letter queue
//!
//! # Example
//!
//! ```rust,no_run
//! use exhibits_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Rendered text is served at http://localhost:9090/metrics by the server binary
//! let _text = server.render();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other crates
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics recorder and renderer.
///
/// Installs the global recorder; the server binary exposes [`MetricsServer::render`]
/// on its metrics port.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsServer")
            .field("addr", &self.addr)
            .field("installed", &self.handle.is_some())
            .finish()
    }
}

impl MetricsServer {
    /// Create a metrics server that will be exposed on `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the metrics endpoint is exposed on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed. A recorder
    /// that is already installed (tests) is not an error.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the recorder was not installed by this server.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    // Lifecycle
    describe_counter!(
        "lifecycle_operations_total",
        "Lifecycle operations by operation, kind and outcome"
    );
    describe_histogram!(
        "lifecycle_operation_duration_seconds",
        "Time taken by lifecycle operations"
    );
    describe_counter!(
        "lifecycle_lock_conflicts_total",
        "Edit lock requests refused because another user holds the lock"
    );
    describe_counter!(
        "lifecycle_compensations_total",
        "Index entries removed after a failed store write"
    );

    // Search index
    describe_counter!(
        "search_index_requests_total",
        "Search index requests by operation and outcome"
    );
    describe_histogram!(
        "search_index_request_duration_seconds",
        "Time taken by search index requests"
    );

    // Scheduler
    describe_counter!("scheduler_tasks_scheduled_total", "Deferred tasks scheduled");
    describe_counter!("scheduler_tasks_completed_total", "Deferred tasks completed");
    describe_counter!(
        "scheduler_tasks_failed_total",
        "Deferred tasks that exhausted their retries"
    );
    describe_counter!(
        "scheduler_tasks_rejected_total",
        "Deferred tasks dropped after a permanent failure"
    );
    describe_counter!(
        "scheduler_tasks_cancelled_total",
        "Deferred tasks cancelled or superseded before finishing"
    );
    describe_gauge!("scheduler_tasks_pending", "Deferred tasks scheduled or running");

    // Retry
    describe_counter!("retry_attempts_total", "Total number of retry attempts");
    describe_counter!("retry_successes_total", "Operations that succeeded after retrying");
    describe_counter!(
        "retry_exhausted_total",
        "Operations that exhausted max retries"
    );

    // Dead letter queue
    describe_counter!("dlq_pushed_total", "Entries added to the dead letter queue");
    describe_counter!("dlq_dropped_total", "Entries dropped from a full dead letter queue");
    describe_gauge!("dlq_size", "Current dead letter queue size");
}

/// Lifecycle operation metrics recorder.
pub struct LifecycleMetrics;

impl LifecycleMetrics {
    /// Record one operation with its outcome (`ok`, `rejected`, `failed`).
    pub fn record_operation(operation: &'static str, kind: &'static str, outcome: &'static str, duration: Duration) {
        counter!(
            "lifecycle_operations_total",
            "operation" => operation,
            "kind" => kind,
            "outcome" => outcome
        )
        .increment(1);
        histogram!("lifecycle_operation_duration_seconds", "operation" => operation)
            .record(duration.as_secs_f64());
    }

    /// Record a refused lock request.
    pub fn record_lock_conflict(kind: &'static str) {
        counter!("lifecycle_lock_conflicts_total", "kind" => kind).increment(1);
    }

    /// Record an index entry removed to compensate a failed store write.
    pub fn record_compensation(kind: &'static str) {
        counter!("lifecycle_compensations_total", "kind" => kind).increment(1);
    }
}

/// Search index call metrics recorder.
pub struct SearchIndexMetrics;

impl SearchIndexMetrics {
    /// Record one request.
    pub fn record_request(operation: &'static str, success: bool, duration: Duration) {
        let outcome = if success { "ok" } else { "error" };
        counter!("search_index_requests_total", "operation" => operation, "outcome" => outcome).increment(1);
        histogram!("search_index_request_duration_seconds", "operation" => operation)
            .record(duration.as_secs_f64());
    }
}

/// Deferred task metrics recorder.
pub struct SchedulerMetrics;

impl SchedulerMetrics {
    /// Record a scheduled task and the resulting pending count.
    pub fn record_scheduled(pending: usize) {
        counter!("scheduler_tasks_scheduled_total").increment(1);
        Self::record_pending(pending);
    }

    /// Record a completed task.
    pub fn record_completed() {
        counter!("scheduler_tasks_completed_total").increment(1);
    }

    /// Record a task that exhausted its retries.
    pub fn record_failed() {
        counter!("scheduler_tasks_failed_total").increment(1);
    }

    /// Record a task that failed permanently and was dropped without retry.
    pub fn record_rejected() {
        counter!("scheduler_tasks_rejected_total").increment(1);
    }

    /// Record a cancelled task (`cancelled` or `superseded`).
    pub fn record_cancelled(reason: &'static str) {
        counter!("scheduler_tasks_cancelled_total", "reason" => reason).increment(1);
    }

    /// Record the number of pending tasks.
    pub fn record_pending(pending: usize) {
        #[allow(clippy::cast_precision_loss)]
        gauge!("scheduler_tasks_pending").set(pending as f64);
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt() {
        counter!("retry_attempts_total").increment(1);
    }

    /// Record a successful retry.
    pub fn record_success() {
        counter!("retry_successes_total").increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted() {
        counter!("retry_exhausted_total").increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.handle().is_none());
        assert!(server.render().is_none());
    }

    #[test]
    fn test_metrics_server_debug_shows_address() {
        let server = MetricsServer::new("127.0.0.1:9090".parse().unwrap());
        assert_eq!(
            format!("{server:?}"),
            "MetricsServer { addr: 127.0.0.1:9090, installed: false }"
        );
    }

    #[test]
    fn test_metrics_server_render() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut server = MetricsServer::new(addr);
        server.start().unwrap();

        LifecycleMetrics::record_operation("publish", "item", "ok", Duration::from_millis(12));
        SchedulerMetrics::record_scheduled(1);

        // Another test may have installed the recorder first; metrics are still recorded.
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("lifecycle_operations_total"));
            assert!(rendered.contains("scheduler_tasks_scheduled_total"));
        }
    }
}
