//! In-memory record store for fast, deterministic testing.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use exhibits_core::record::{ExhibitId, ExhibitSummary, Record, RecordId, RecordKind, Scope, UserId};
use exhibits_core::record_store::{RecordFilter, RecordPatch, RecordStore, RecordStoreError, StoreFuture};
use exhibits_core::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Record store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// `insert`
    Insert,
    /// `select`
    Select,
    /// `update`
    Update,
    /// `purge`
    Purge,
    /// `max_order`
    MaxOrder,
    /// `exhibit` and `touch_exhibit`
    Exhibit,
}

#[derive(Debug, Default)]
struct StoreState {
    tables: HashMap<RecordKind, Vec<Record>>,
    exhibits: HashMap<ExhibitId, ExhibitSummary>,
    failing: HashSet<StoreOperation>,
}

impl StoreState {
    fn check(&self, operation: StoreOperation) -> Result<(), RecordStoreError> {
        if self.failing.contains(&operation) {
            Err(RecordStoreError::Database(format!("injected {operation:?} failure")))
        } else {
            Ok(())
        }
    }
}

/// `HashMap`-backed [`RecordStore`] with an exhibit registry and failure injection.
///
/// Every operation runs under one write lock, so conditional updates are as
/// atomic as their SQL counterparts.
///
/// # Example
///
/// ```
/// use exhibits_core::record::{ExhibitId, RecordKind};
/// use exhibits_core::record_store::{RecordFilter, RecordStore};
/// use exhibits_testing::{InMemoryRecordStore, RecordBuilder};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryRecordStore::new();
/// let exhibit = ExhibitId::new("e1");
/// store.add_exhibit(exhibit.clone(), true);
///
/// store.insert(RecordBuilder::new(RecordKind::Heading, exhibit.clone()).build()).await?;
/// let rows = store.select(RecordKind::Heading, RecordFilter::exhibit(&exhibit)).await?;
/// assert_eq!(rows.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryRecordStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an exhibit.
    pub fn add_exhibit(&self, exhibit_id: ExhibitId, published: bool) {
        self.state.write().unwrap().exhibits.insert(
            exhibit_id.clone(),
            ExhibitSummary {
                uuid: exhibit_id,
                is_published: published,
                updated: None,
                updated_by: None,
            },
        );
    }

    /// Change an exhibit's publication flag.
    pub fn set_exhibit_published(&self, exhibit_id: &ExhibitId, published: bool) {
        if let Some(exhibit) = self.state.write().unwrap().exhibits.get_mut(exhibit_id) {
            exhibit.is_published = published;
        }
    }

    /// Current exhibit summary.
    #[must_use]
    pub fn exhibit_summary(&self, exhibit_id: &ExhibitId) -> Option<ExhibitSummary> {
        self.state.read().unwrap().exhibits.get(exhibit_id).cloned()
    }

    /// Insert a record directly, bypassing duplicate checks and failure injection.
    pub fn seed(&self, record: Record) {
        self.state
            .write()
            .unwrap()
            .tables
            .entry(record.kind)
            .or_default()
            .push(record);
    }

    /// Look up a row regardless of deletion state.
    #[must_use]
    pub fn record(&self, kind: RecordKind, uuid: &RecordId) -> Option<Record> {
        self.state
            .read()
            .unwrap()
            .tables
            .get(&kind)
            .and_then(|rows| rows.iter().find(|r| &r.uuid == uuid).cloned())
    }

    /// Every row of a kind, deleted ones included.
    #[must_use]
    pub fn rows(&self, kind: RecordKind) -> Vec<Record> {
        self.state
            .read()
            .unwrap()
            .tables
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Make an operation fail (or succeed again).
    pub fn set_failing(&self, operation: StoreOperation, failing: bool) {
        let mut state = self.state.write().unwrap();
        if failing {
            state.failing.insert(operation);
        } else {
            state.failing.remove(&operation);
        }
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert(&self, record: Record) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            state.check(StoreOperation::Insert)?;
            let rows = state.tables.entry(record.kind).or_default();
            if rows.iter().any(|r| r.uuid == record.uuid) {
                return Err(RecordStoreError::Duplicate(record.uuid));
            }
            rows.push(record);
            Ok(())
        })
    }

    fn select(&self, kind: RecordKind, filter: RecordFilter) -> StoreFuture<'_, Vec<Record>> {
        Box::pin(async move {
            let state = self.state.read().unwrap();
            state.check(StoreOperation::Select)?;
            let mut rows: Vec<Record> = state
                .tables
                .get(&kind)
                .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
                .unwrap_or_default();
            rows.sort_by(|a, b| a.order.cmp(&b.order).then(a.created.cmp(&b.created)));
            Ok(rows)
        })
    }

    fn update(&self, kind: RecordKind, filter: RecordFilter, patch: RecordPatch) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            state.check(StoreOperation::Update)?;
            let mut affected = 0;
            if let Some(rows) = state.tables.get_mut(&kind) {
                for row in rows.iter_mut().filter(|r| filter.matches(r)) {
                    patch.apply_to(row);
                    affected += 1;
                }
            }
            Ok(affected)
        })
    }

    fn purge(&self, kind: RecordKind, filter: RecordFilter) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            state.check(StoreOperation::Purge)?;
            let Some(rows) = state.tables.get_mut(&kind) else {
                return Ok(0);
            };
            let before = rows.len();
            rows.retain(|r| !filter.matches(r));
            Ok((before - rows.len()) as u64)
        })
    }

    fn max_order(&self, kind: RecordKind, scope: Scope) -> StoreFuture<'_, Option<i64>> {
        Box::pin(async move {
            let state = self.state.read().unwrap();
            state.check(StoreOperation::MaxOrder)?;
            Ok(state.tables.get(&kind).and_then(|rows| {
                rows.iter()
                    .filter(|r| r.is_member_of_exhibit == scope.exhibit_id && r.container == scope.container)
                    .map(|r| r.order)
                    .max()
            }))
        })
    }

    fn exhibit(&self, exhibit_id: ExhibitId) -> StoreFuture<'_, Option<ExhibitSummary>> {
        Box::pin(async move {
            let state = self.state.read().unwrap();
            state.check(StoreOperation::Exhibit)?;
            Ok(state.exhibits.get(&exhibit_id).cloned())
        })
    }

    fn touch_exhibit(&self, exhibit_id: ExhibitId, at: DateTime<Utc>, by: Option<UserId>) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            state.check(StoreOperation::Exhibit)?;
            Ok(state.exhibits.get_mut(&exhibit_id).map_or(0, |exhibit| {
                exhibit.updated = Some(at);
                exhibit.updated_by = by;
                1
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordBuilder;
    use exhibits_core::record_store::{LockChange, LockGuard, Visibility};

    #[tokio::test]
    async fn test_conditional_lock_update_affects_one_row() {
        let store = InMemoryRecordStore::new();
        let exhibit = ExhibitId::new("e1");
        let record = RecordBuilder::new(RecordKind::Item, exhibit.clone()).build();
        let scope = record.scope();
        let uuid = record.uuid.clone();
        store.seed(record);

        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let acquire = |user: &UserId| {
            (
                RecordFilter::record(&scope, &uuid).with_lock(LockGuard::LockableBy(user.clone())),
                RecordPatch::new().lock(LockChange::Acquire(user.clone())),
            )
        };

        let (filter, patch) = acquire(&alice);
        assert_eq!(store.update(RecordKind::Item, filter, patch).await.unwrap(), 1);
        let (filter, patch) = acquire(&bob);
        assert_eq!(store.update(RecordKind::Item, filter, patch).await.unwrap(), 0);
        assert_eq!(store.record(RecordKind::Item, &uuid).unwrap().locked_by_user, Some(alice));
    }

    #[tokio::test]
    async fn test_max_order_includes_deleted_rows() {
        let store = InMemoryRecordStore::new();
        let exhibit = ExhibitId::new("e1");
        store.seed(RecordBuilder::new(RecordKind::Heading, exhibit.clone()).order(3).deleted(true).build());
        store.seed(RecordBuilder::new(RecordKind::Heading, exhibit.clone()).order(1).build());

        let scope = Scope::exhibit(exhibit.clone());
        assert_eq!(store.max_order(RecordKind::Heading, scope.clone()).await.unwrap(), Some(3));
        assert_eq!(store.max_order(RecordKind::Grid, scope).await.unwrap(), None);

        let active = store
            .select(RecordKind::Heading, RecordFilter::exhibit(&exhibit))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        let all = store
            .select(
                RecordKind::Heading,
                RecordFilter::exhibit(&exhibit).with_visibility(Visibility::Any),
            )
            .await
            .unwrap();
        assert_eq!(all.iter().map(|r| r.order).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = InMemoryRecordStore::new();
        store.set_failing(StoreOperation::Insert, true);
        let record = RecordBuilder::new(RecordKind::Item, ExhibitId::new("e1")).build();
        assert!(matches!(
            store.insert(record.clone()).await,
            Err(RecordStoreError::Database(_))
        ));

        store.set_failing(StoreOperation::Insert, false);
        store.insert(record.clone()).await.unwrap();
        assert_eq!(
            store.insert(record.clone()).await,
            Err(RecordStoreError::Duplicate(record.uuid))
        );
    }
}
