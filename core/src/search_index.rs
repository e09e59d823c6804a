//! Search index abstraction.
//!
//! The search index is an external service that makes published records
//! discoverable. It is not transactional with the record store: callers
//! decide the order of index and store writes and own the reconciliation of
//! any divergence.

use crate::record::{ExhibitId, RecordId, RecordKind};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by search index operations.
pub type IndexFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SearchIndexError>> + Send + 'a>>;

/// Errors reported by the search index service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchIndexError {
    /// The service could not be reached.
    #[error("Search index unavailable: {0}")]
    Unavailable(String),

    /// The service answered with an unexpected status.
    #[error("Search index rejected request with status {status}: {message}")]
    Rejected {
        /// HTTP-style status code returned by the service
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// The request did not complete in time.
    #[error("Search index request timed out")]
    Timeout,
}

/// Opaque indexing API.
pub trait SearchIndex: Send + Sync {
    /// Index (or re-index) a record so it becomes searchable.
    ///
    /// # Errors
    ///
    /// Returns [`SearchIndexError`] if the service did not confirm indexing.
    fn index_record(
        &self,
        kind: RecordKind,
        exhibit_id: ExhibitId,
        record_id: RecordId,
    ) -> IndexFuture<'_, ()>;

    /// Remove a record from the index. Removing an absent record succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`SearchIndexError`] if the service did not confirm removal.
    fn delete_record(&self, record_id: RecordId) -> IndexFuture<'_, ()>;

    /// Whether the index currently holds the record.
    ///
    /// # Errors
    ///
    /// Returns [`SearchIndexError`] if the service could not answer.
    fn contains(&self, record_id: RecordId) -> IndexFuture<'_, bool>;
}
