//! # Exhibits Server
//!
//! Process-level wiring for the exhibits lifecycle service.
//!
//! - [`Config`]: environment-driven configuration
//! - [`HttpSearchIndex`]: `reqwest` client for the external indexer
//! - [`Application`]: connects the record store, index and deferred task
//!   queue, serves the HTTP API and metrics, and drains on shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod config;
pub mod error;
pub mod search_index;

pub use app::{Application, DatabaseProbe, build_coordinator};
pub use config::Config;
pub use error::ServerError;
pub use search_index::HttpSearchIndex;
