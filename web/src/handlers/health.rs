//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use exhibits_runtime::{HealthCheck, HealthReport};
use serde::Serialize;
use std::collections::BTreeMap;

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running.
/// This endpoint does NOT check dependencies (database, etc.).
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// One component of a readiness answer.
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    /// Component name
    pub component: String,
    /// `healthy`, `degraded` or `unhealthy`
    pub status: &'static str,
    /// Details, when not healthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Component-specific figures
    pub metadata: BTreeMap<String, String>,
}

impl From<HealthCheck> for ComponentHealth {
    fn from(check: HealthCheck) -> Self {
        Self {
            component: check.component,
            status: check.status.as_str(),
            message: check.message,
            metadata: check.metadata.into_iter().collect(),
        }
    }
}

/// Readiness answer.
#[derive(Debug, Serialize)]
pub struct Readiness {
    /// Worst component status
    pub status: &'static str,
    /// Individual checks
    pub checks: Vec<ComponentHealth>,
    /// RFC 3339 time the report was taken
    pub timestamp: String,
}

/// Health check with dependency diagnostics (for readiness).
///
/// # Status Codes
///
/// - 200 OK: Healthy or Degraded
/// - 503 Service Unavailable: Unhealthy
///
/// ```text
/// GET /health/ready
/// ```
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let report = HealthReport::new(state.check_health().await);

    let status = if report.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = Readiness {
        status: report.status.as_str(),
        timestamp: report.timestamp.to_rfc3339(),
        checks: report.checks.into_iter().map(ComponentHealth::from).collect(),
    };
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[test]
    fn test_component_health_flattens_metadata() {
        let check = HealthCheck::degraded("scheduler", "Dead letter queue is 60% full")
            .with_metadata("dlq_size", "600");

        let component = ComponentHealth::from(check);

        assert_eq!(component.status, "degraded");
        assert_eq!(component.metadata.get("dlq_size").map(String::as_str), Some("600"));
    }
}
