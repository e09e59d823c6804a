//! Recording search index for testing publish and suppress flows.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use exhibits_core::record::{ExhibitId, RecordId, RecordKind};
use exhibits_core::search_index::{IndexFuture, SearchIndex, SearchIndexError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One call received by the index, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexCall {
    /// `index_record`
    Index {
        /// Record kind
        kind: RecordKind,
        /// Owning exhibit
        exhibit_id: ExhibitId,
        /// Indexed record
        record_id: RecordId,
    },
    /// `delete_record`
    Delete(RecordId),
    /// `contains`
    Contains(RecordId),
}

#[derive(Debug, Default)]
struct IndexState {
    entries: HashMap<RecordId, (RecordKind, ExhibitId)>,
    calls: Vec<IndexCall>,
    fail_index: bool,
    fail_delete: bool,
    fail_contains: bool,
}

/// In-memory [`SearchIndex`] that records every call.
///
/// Failed calls are still recorded but leave the entries untouched.
#[derive(Clone, Debug, Default)]
pub struct RecordingSearchIndex {
    state: Arc<Mutex<IndexState>>,
}

impl RecordingSearchIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a record is currently indexed.
    #[must_use]
    pub fn is_indexed(&self, record_id: &RecordId) -> bool {
        self.state.lock().unwrap().entries.contains_key(record_id)
    }

    /// Number of indexed records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    /// Whether nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Put an entry in the index directly, without recording a call.
    pub fn seed(&self, kind: RecordKind, exhibit_id: ExhibitId, record_id: RecordId) {
        self.state
            .lock()
            .unwrap()
            .entries
            .insert(record_id, (kind, exhibit_id));
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<IndexCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Make `index_record` fail.
    pub fn set_fail_index(&self, failing: bool) {
        self.state.lock().unwrap().fail_index = failing;
    }

    /// Make `delete_record` fail.
    pub fn set_fail_delete(&self, failing: bool) {
        self.state.lock().unwrap().fail_delete = failing;
    }

    /// Make `contains` fail.
    pub fn set_fail_contains(&self, failing: bool) {
        self.state.lock().unwrap().fail_contains = failing;
    }
}

fn unavailable() -> SearchIndexError {
    SearchIndexError::Unavailable("injected failure".to_string())
}

impl SearchIndex for RecordingSearchIndex {
    fn index_record(&self, kind: RecordKind, exhibit_id: ExhibitId, record_id: RecordId) -> IndexFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.calls.push(IndexCall::Index {
                kind,
                exhibit_id: exhibit_id.clone(),
                record_id: record_id.clone(),
            });
            if state.fail_index {
                return Err(unavailable());
            }
            state.entries.insert(record_id, (kind, exhibit_id));
            Ok(())
        })
    }

    fn delete_record(&self, record_id: RecordId) -> IndexFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.calls.push(IndexCall::Delete(record_id.clone()));
            if state.fail_delete {
                return Err(unavailable());
            }
            state.entries.remove(&record_id);
            Ok(())
        })
    }

    fn contains(&self, record_id: RecordId) -> IndexFuture<'_, bool> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.calls.push(IndexCall::Contains(record_id.clone()));
            if state.fail_contains {
                return Err(unavailable());
            }
            Ok(state.entries.contains_key(&record_id))
        })
    }
}
