//! Record store abstraction.
//!
//! The record store is the source of truth for content records. It is modeled
//! as a table-per-kind store with scoped `select` / `update` / `purge`
//! operations filtered by a [`RecordFilter`], which maps directly onto
//! `SELECT ... WHERE` and `UPDATE ... WHERE` statements.
//!
//! # Implementations
//!
//! - `PostgresRecordStore` (in `exhibits-postgres`): production implementation
//! - `InMemoryRecordStore` (in `exhibits-testing`): fast, deterministic testing
//!
//! # Atomicity
//!
//! Each call is atomic on its own. Edit locks rely on this: acquiring a lock is
//! one conditional `update` guarded by [`LockGuard::LockableBy`], so two
//! simultaneous first viewers can never both succeed.
//!
//! # Dyn Compatibility
//!
//! Like the other collaborator traits, methods return explicit
//! `Pin<Box<dyn Future>>` values so the store can be shared as
//! `Arc<dyn RecordStore>` inside the lifecycle environment.

use crate::record::{ExhibitId, ExhibitSummary, Record, RecordId, RecordKind, Scope, Styles, UserId};
use crate::{DateTime, Utc};
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by record store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RecordStoreError>> + Send + 'a>>;

/// Errors that can occur during record store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordStoreError {
    /// Database connection or query failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A transaction could not be committed and was rolled back.
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// A record with the same identifier already exists.
    #[error("Duplicate record: {0}")]
    Duplicate(RecordId),

    /// Stored data could not be decoded into a record.
    #[error("Corrupt record {uuid}: {reason}")]
    Corrupt {
        /// Record that failed to decode
        uuid: RecordId,
        /// What was wrong with it
        reason: String,
    },
}

/// Which rows a query sees with respect to soft deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Only rows with `is_deleted = 0` (normal reads)
    #[default]
    Active,
    /// Only rows with `is_deleted = 1` (recycle bin)
    Deleted,
    /// All rows
    Any,
}

/// Condition on the edit lock columns of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockGuard {
    /// `locked_by_user IS NULL`
    Unlocked,
    /// `locked_by_user IS NULL OR locked_by_user = user`
    LockableBy(UserId),
    /// `locked_by_user = user`
    HeldBy(UserId),
}

/// Row filter for `select`, `update` and `purge`.
///
/// The exhibit is always part of the filter so every query is scoped to one
/// exhibit. A `container` of `None` means "any container" for nested kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    /// Owning exhibit
    pub exhibit_id: ExhibitId,
    /// Owning grid or timeline
    pub container: Option<RecordId>,
    /// Single record
    pub uuid: Option<RecordId>,
    /// Soft-delete visibility
    pub visibility: Visibility,
    /// Lock condition
    pub lock: Option<LockGuard>,
    /// Publication condition
    pub published: Option<bool>,
    /// Condition on the container hold marker
    pub held_by_container: Option<bool>,
}

impl RecordFilter {
    /// Active rows of a scope.
    #[must_use]
    pub fn scope(scope: &Scope) -> Self {
        Self {
            exhibit_id: scope.exhibit_id.clone(),
            container: scope.container.clone(),
            uuid: None,
            visibility: Visibility::Active,
            lock: None,
            published: None,
            held_by_container: None,
        }
    }

    /// Active rows of a whole exhibit, regardless of container.
    #[must_use]
    pub fn exhibit(exhibit_id: &ExhibitId) -> Self {
        Self {
            exhibit_id: exhibit_id.clone(),
            container: None,
            uuid: None,
            visibility: Visibility::Active,
            lock: None,
            published: None,
            held_by_container: None,
        }
    }

    /// The active row `uuid` inside a scope.
    #[must_use]
    pub fn record(scope: &Scope, uuid: &RecordId) -> Self {
        Self::scope(scope).with_uuid(uuid.clone())
    }

    /// Restrict to one record.
    #[must_use]
    pub fn with_uuid(mut self, uuid: RecordId) -> Self {
        self.uuid = Some(uuid);
        self
    }

    /// Restrict to one container.
    #[must_use]
    pub fn with_container(mut self, container: RecordId) -> Self {
        self.container = Some(container);
        self
    }

    /// Change soft-delete visibility.
    #[must_use]
    pub const fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Add a lock condition.
    #[must_use]
    pub fn with_lock(mut self, guard: LockGuard) -> Self {
        self.lock = Some(guard);
        self
    }

    /// Add a publication condition.
    #[must_use]
    pub const fn with_published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }

    /// Add a condition on the container hold marker.
    #[must_use]
    pub const fn with_held_by_container(mut self, held: bool) -> Self {
        self.held_by_container = Some(held);
        self
    }

    /// Whether `record` satisfies this filter.
    ///
    /// Shared by in-memory implementations so they agree with the SQL semantics.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        if record.is_member_of_exhibit != self.exhibit_id {
            return false;
        }
        if let Some(container) = &self.container {
            if record.container.as_ref() != Some(container) {
                return false;
            }
        }
        if let Some(uuid) = &self.uuid {
            if &record.uuid != uuid {
                return false;
            }
        }
        let visible = match self.visibility {
            Visibility::Active => !record.is_deleted,
            Visibility::Deleted => record.is_deleted,
            Visibility::Any => true,
        };
        if !visible {
            return false;
        }
        if let Some(published) = self.published {
            if record.is_published != published {
                return false;
            }
        }
        if let Some(held) = self.held_by_container {
            if record.held_by_container != held {
                return false;
            }
        }
        match &self.lock {
            None => true,
            Some(LockGuard::Unlocked) => record.locked_by_user.is_none(),
            Some(LockGuard::LockableBy(user)) => record
                .locked_by_user
                .as_ref()
                .is_none_or(|holder| holder == user),
            Some(LockGuard::HeldBy(user)) => record.locked_by_user.as_ref() == Some(user),
        }
    }
}

/// Change to the lock columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockChange {
    /// Set `is_locked = 1, locked_by_user = user`
    Acquire(UserId),
    /// Set `is_locked = 0, locked_by_user = NULL`
    Release,
}

/// Column assignments for `update`. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    /// Kind-specific fields, merged over the existing content
    pub content: Option<Map<String, Value>>,
    /// Replacement styles
    pub styles: Option<Styles>,
    /// New sibling position
    pub order: Option<i64>,
    /// New publication flag
    pub published: Option<bool>,
    /// New soft-delete flag
    pub deleted: Option<bool>,
    /// New container hold marker
    pub held_by_container: Option<bool>,
    /// Lock change
    pub lock: Option<LockChange>,
    /// Audit stamp
    pub updated: Option<(DateTime<Utc>, Option<UserId>)>,
}

impl RecordPatch {
    /// Empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge content fields.
    #[must_use]
    pub fn content(mut self, content: Map<String, Value>) -> Self {
        self.content = Some(content);
        self
    }

    /// Replace styles.
    #[must_use]
    pub fn styles(mut self, styles: Styles) -> Self {
        self.styles = Some(styles);
        self
    }

    /// Set the sibling position.
    #[must_use]
    pub const fn order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    /// Set the publication flag.
    #[must_use]
    pub const fn published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }

    /// Set the soft-delete flag.
    #[must_use]
    pub const fn deleted(mut self, deleted: bool) -> Self {
        self.deleted = Some(deleted);
        self
    }

    /// Set or clear the container hold marker.
    #[must_use]
    pub const fn held_by_container(mut self, held: bool) -> Self {
        self.held_by_container = Some(held);
        self
    }

    /// Change the lock.
    #[must_use]
    pub fn lock(mut self, change: LockChange) -> Self {
        self.lock = Some(change);
        self
    }

    /// Stamp the update time and user.
    #[must_use]
    pub fn updated(mut self, at: DateTime<Utc>, by: Option<UserId>) -> Self {
        self.updated = Some((at, by));
        self
    }

    /// Apply this patch to an in-memory record.
    pub fn apply_to(&self, record: &mut Record) {
        if let Some(content) = &self.content {
            for (key, value) in content {
                record.content.insert(key.clone(), value.clone());
            }
        }
        if let Some(styles) = &self.styles {
            record.styles = styles.clone();
        }
        if let Some(order) = self.order {
            record.order = order;
        }
        if let Some(published) = self.published {
            record.is_published = published;
        }
        if let Some(deleted) = self.deleted {
            record.is_deleted = deleted;
        }
        if let Some(held) = self.held_by_container {
            record.held_by_container = held;
        }
        match &self.lock {
            Some(LockChange::Acquire(user)) => record.locked_by_user = Some(user.clone()),
            Some(LockChange::Release) => record.locked_by_user = None,
            None => {}
        }
        if let Some((at, by)) = &self.updated {
            record.updated = Some(*at);
            record.updated_by.clone_from(by);
        }
    }
}

/// Transactional table-per-kind record store.
pub trait RecordStore: Send + Sync {
    /// Insert a new record inside a transaction.
    ///
    /// # Errors
    ///
    /// - `Duplicate`: a record with the same uuid exists
    /// - `Transaction` / `Database`: the write failed and was rolled back
    fn insert(&self, record: Record) -> StoreFuture<'_, ()>;

    /// Select rows of `kind` matching `filter`, ordered by `order` then `created`.
    ///
    /// An empty result is not an error.
    ///
    /// # Errors
    ///
    /// - `Database`: the query failed
    /// - `Corrupt`: a row could not be decoded
    fn select(&self, kind: RecordKind, filter: RecordFilter) -> StoreFuture<'_, Vec<Record>>;

    /// Apply `patch` to every row of `kind` matching `filter` in one statement.
    ///
    /// Returns the number of rows affected.
    ///
    /// # Errors
    ///
    /// - `Database`: the statement failed
    fn update(&self, kind: RecordKind, filter: RecordFilter, patch: RecordPatch)
    -> StoreFuture<'_, u64>;

    /// Permanently delete every row of `kind` matching `filter`.
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// - `Database`: the statement failed
    fn purge(&self, kind: RecordKind, filter: RecordFilter) -> StoreFuture<'_, u64>;

    /// Highest `order` among all rows (deleted included) of a scope.
    ///
    /// # Errors
    ///
    /// - `Database`: the query failed
    fn max_order(&self, kind: RecordKind, scope: Scope) -> StoreFuture<'_, Option<i64>>;

    /// Look up the owning exhibit.
    ///
    /// # Errors
    ///
    /// - `Database`: the query failed
    fn exhibit(&self, exhibit_id: ExhibitId) -> StoreFuture<'_, Option<ExhibitSummary>>;

    /// Set the exhibit's `updated` / `updated_by` columns.
    ///
    /// # Errors
    ///
    /// - `Database`: the statement failed
    fn touch_exhibit(
        &self,
        exhibit_id: ExhibitId,
        at: DateTime<Utc>,
        by: Option<UserId>,
    ) -> StoreFuture<'_, u64>;
}
