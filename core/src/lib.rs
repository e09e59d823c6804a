//! # Exhibits Core
//!
//! Core types and collaborator traits for the exhibits lifecycle service.
//!
//! Every content record of an exhibit (headings, items, grids, timelines and
//! the items nested in grids and timelines) follows one lifecycle: draft,
//! locked for editing, published or suppressed, soft-deleted into the recycle
//! bin, then restored or purged. This crate describes that lifecycle without
//! performing any I/O.
//!
//! ## Core Concepts
//!
//! - **Record**: a persisted content record, addressed by [`RecordKind`] and [`Scope`]
//! - **RecordStore**: transactional table-per-kind source of truth
//! - **SearchIndex**: external, non-transactional public index
//! - **Validator**: opaque schema validation returning issues
//! - **TaskScheduler**: keyed delayed execution for deferred republication
//! - **RecordLifecycle**: pure state machine guarding every transition
//!
//! ## Architecture Principles
//!
//! - Functional core: transitions are checked by [`lifecycle::RecordLifecycle`] before any I/O
//! - Dependency injection: collaborators are `Arc<dyn Trait>` in an environment struct
//! - Structured results: operations answer with [`ApiResponse`] / [`Ack`], never panics

pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod record;
pub mod record_store;
pub mod response;
pub mod schedule;
pub mod search_index;
pub mod validation;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde;
pub use serde_json;

pub use environment::{AdminList, Authorizer, Clock, SystemClock};
pub use error::LifecycleError;
pub use lifecycle::{LifecycleCommand, RecordLifecycle, TransitionError};
pub use record::{
    ExhibitId, ExhibitSummary, InvalidStyles, KindDescriptor, Record, RecordId, RecordKind, Scope, Styles,
    UnknownKind, UserId,
};
pub use record_store::{
    LockChange, LockGuard, RecordFilter, RecordPatch, RecordStore, RecordStoreError, StoreFuture, Visibility,
};
pub use response::{Ack, AckFailure, ApiResponse};
pub use schedule::{DeferredTask, ScheduleError, TaskError, TaskFuture, TaskKey, TaskScheduler};
pub use search_index::{IndexFuture, SearchIndex, SearchIndexError};
pub use validation::{SchemaValidator, ValidationIssue, ValidationMode, Validator};
