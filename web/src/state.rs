//! Application state for Axum handlers.

use exhibits_lifecycle::LifecycleCoordinator;
use exhibits_runtime::{DelayedTaskQueue, HealthCheck};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by [`HealthProbe::check`].
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = HealthCheck> + Send + 'a>>;

/// A dependency consulted by the readiness endpoint.
pub trait HealthProbe: Send + Sync {
    /// Check the dependency.
    fn check(&self) -> ProbeFuture<'_>;
}

impl HealthProbe for DelayedTaskQueue {
    fn check(&self) -> ProbeFuture<'_> {
        Box::pin(async move { self.health() })
    }
}

/// Application state shared across all HTTP handlers.
///
/// Cheap to clone: the coordinator and probes are reference counted.
///
/// # Examples
///
/// ```ignore
/// let state = AppState::new(coordinator).with_probe(Arc::new(scheduler.clone()));
/// let app = exhibits_web::router(state);
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Lifecycle coordinator every record route dispatches to
    pub coordinator: LifecycleCoordinator,
    probes: Vec<Arc<dyn HealthProbe>>,
}

impl AppState {
    /// Create application state around a coordinator.
    #[must_use]
    pub const fn new(coordinator: LifecycleCoordinator) -> Self {
        Self {
            coordinator,
            probes: Vec::new(),
        }
    }

    /// Add a dependency to the readiness check.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    /// Run every readiness probe.
    pub async fn check_health(&self) -> Vec<HealthCheck> {
        futures::future::join_all(self.probes.iter().map(|probe| probe.check())).await
    }
}
