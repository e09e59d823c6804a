//! Axum HTTP surface for the exhibits lifecycle service.
//!
//! A thin imperative shell over [`exhibits_lifecycle::LifecycleCoordinator`]:
//!
//! 1. **Extract** the record kind, scope and id from the path, and the acting
//!    user from the `X-User-Id` header
//! 2. **Dispatch** to the coordinator, which never fails with an error
//! 3. **Map** its structured response onto the HTTP status it carries
//!
//! # Example
//!
//! ```ignore
//! use exhibits_web::{AppState, router};
//!
//! let app = router(AppState::new(coordinator));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{ActingUser, RecordCollection, RecordMember, USER_ID_HEADER};
pub use middleware::{CORRELATION_ID_HEADER, CorrelationId, correlation_id_layer};
pub use routes::router;
pub use state::{AppState, HealthProbe, ProbeFuture};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
