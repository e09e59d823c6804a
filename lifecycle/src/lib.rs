//! # Exhibits Lifecycle
//!
//! The lifecycle coordinator for exhibit content records, written once for
//! every record kind.
//!
//! - [`LockManager`]: advisory single-editor locks taken by one conditional update
//! - [`LifecycleCoordinator`]: create, read, update, delete, publish, suppress, reorder
//! - Republish: an edit suppresses the record now and republishes it later,
//!   through a keyed task that newer edits and deletes cancel
//! - [`RecycleManager`]: list, restore and purge soft-deleted records
//! - [`ReconciliationSweep`]: compare store flags against index membership
//!
//! ## Example
//!
//! ```
//! use exhibits_core::record::{ExhibitId, RecordKind, Scope};
//! use exhibits_lifecycle::{LifecycleConfig, LifecycleCoordinator, LifecycleEnvironment};
//! use exhibits_testing::{InMemoryRecordStore, ManualScheduler, RecordingSearchIndex};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let env = LifecycleEnvironment::new(
//!     Arc::new(InMemoryRecordStore::new()),
//!     Arc::new(RecordingSearchIndex::new()),
//!     Arc::new(ManualScheduler::new()),
//! );
//! let coordinator = LifecycleCoordinator::new(env, LifecycleConfig::default());
//!
//! let scope = Scope::exhibit(ExhibitId::new("e1"));
//! let response = coordinator
//!     .create(RecordKind::Heading, &scope, json!({"text": "Intro"}), None)
//!     .await;
//! assert_eq!(response.status, 201);
//! # }
//! ```

pub mod coordinator;
pub mod environment;
pub mod lock;
pub mod payload;
pub mod reconcile;
pub mod recycle;
pub mod republish;

pub use coordinator::{LifecycleCoordinator, ReorderItem, ReorderReport};
pub use environment::{DEFAULT_REPUBLISH_DELAY, LifecycleConfig, LifecycleEnvironment};
pub use lock::{LockManager, LockOutcome, UnlockOptions, UnlockOutcome};
pub use reconcile::{Drift, ReconciliationSweep, SweepMode, SweepReport};
pub use recycle::{RecycleManager, RecycledRecord};
pub use republish::RepublishOutcome;
