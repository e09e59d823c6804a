//! Startup and serving errors for the server binary.

use exhibits_core::record_store::RecordStoreError;
use exhibits_runtime::metrics::MetricsError;
use thiserror::Error;

/// Errors that stop the service from starting or serving.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The record store could not be reached or migrated
    #[error("Record store error: {0}")]
    Store(#[from] RecordStoreError),

    /// The search index HTTP client could not be built
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Binding or serving a listener failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The Prometheus recorder could not be installed
    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    /// A configured listen address does not parse
    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),
}
