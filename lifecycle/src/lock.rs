//! Advisory single-editor locks.
//!
//! A lock is taken with one conditional update guarded by
//! [`LockGuard::LockableBy`], so two first viewers racing on an unlocked
//! record can never both win. The holder is only read back after a failed
//! update, to tell the loser who has the record.

use exhibits_core::environment::Authorizer;
use exhibits_core::lifecycle::{LifecycleCommand, RecordLifecycle, TransitionError};
use exhibits_core::record::{RecordId, RecordKind, Scope, UserId};
use exhibits_core::record_store::{LockChange, LockGuard, RecordFilter, RecordPatch, RecordStore};
use exhibits_runtime::metrics::LifecycleMetrics;
use serde::Serialize;
use std::sync::Arc;

/// Result of a lock attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LockOutcome {
    /// The caller holds the lock (newly or already).
    Acquired,
    /// Another editor holds the lock.
    Conflict {
        /// Current holder
        holder: UserId,
    },
    /// The record is missing, deleted, or the store failed.
    Unavailable,
}

impl LockOutcome {
    /// Whether the caller now holds the lock.
    #[must_use]
    pub const fn is_acquired(&self) -> bool {
        matches!(self, Self::Acquired)
    }
}

/// Result of an unlock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockOutcome {
    /// The record is unlocked.
    Released,
    /// The caller neither holds the lock nor may bypass it.
    NotLockOwner,
    /// No active record with that id.
    NotFound,
    /// The store failed.
    Unavailable,
}

/// Options for [`LockManager::unlock`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnlockOptions {
    /// Release regardless of holder
    pub force: bool,
}

impl UnlockOptions {
    /// Release regardless of holder.
    #[must_use]
    pub const fn forced() -> Self {
        Self { force: true }
    }
}

/// Acquires and releases edit locks through the record store.
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn RecordStore>,
    authorizer: Arc<dyn Authorizer>,
}

impl LockManager {
    /// Create a lock manager.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self { store, authorizer }
    }

    /// Take the edit lock on a record for `user`.
    ///
    /// Re-acquiring a lock already held by `user` succeeds.
    #[tracing::instrument(skip(self), fields(kind = %kind, record_id = %id, user_id = %user))]
    pub async fn lock(&self, kind: RecordKind, scope: &Scope, id: &RecordId, user: &UserId) -> LockOutcome {
        // A holder can release between our update and our read; one retry covers that.
        for _ in 0..2 {
            let filter = RecordFilter::record(scope, id).with_lock(LockGuard::LockableBy(user.clone()));
            let patch = RecordPatch::new().lock(LockChange::Acquire(user.clone()));
            match self.store.update(kind, filter, patch).await {
                Ok(0) => {}
                Ok(_) => {
                    tracing::debug!("Lock acquired");
                    return LockOutcome::Acquired;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Lock update failed");
                    return LockOutcome::Unavailable;
                }
            }

            let current = match self.store.select(kind, RecordFilter::record(scope, id)).await {
                Ok(rows) => rows.into_iter().next(),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read lock holder");
                    return LockOutcome::Unavailable;
                }
            };
            let Some(current) = current else {
                tracing::debug!("Record not found, nothing to lock");
                return LockOutcome::Unavailable;
            };

            match RecordLifecycle::from(&current).apply(&LifecycleCommand::Lock(user.clone())) {
                Err(TransitionError::LockedBy(holder)) => {
                    tracing::info!(holder = %holder, "Record is locked by another user");
                    LifecycleMetrics::record_lock_conflict(kind.as_str());
                    return LockOutcome::Conflict { holder };
                }
                Err(_) => return LockOutcome::Unavailable,
                Ok(_) => {}
            }
        }

        tracing::warn!("Lock holder changed repeatedly, giving up");
        LockOutcome::Unavailable
    }

    /// Release the edit lock.
    ///
    /// The holder may always release. Anyone else needs `force` or
    /// administrator privilege from the authorizer.
    #[tracing::instrument(skip(self), fields(kind = %kind, record_id = %id, user_id = %user))]
    pub async fn unlock(
        &self,
        kind: RecordKind,
        scope: &Scope,
        id: &RecordId,
        user: &UserId,
        options: UnlockOptions,
    ) -> UnlockOutcome {
        let bypass = options.force || self.authorizer.is_admin(user).await;

        let mut filter = RecordFilter::record(scope, id);
        if !bypass {
            filter = filter.with_lock(LockGuard::HeldBy(user.clone()));
        }

        match self
            .store
            .update(kind, filter, RecordPatch::new().lock(LockChange::Release))
            .await
        {
            Ok(0) => {}
            Ok(_) => {
                tracing::debug!(bypass, "Lock released");
                return UnlockOutcome::Released;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unlock update failed");
                return UnlockOutcome::Unavailable;
            }
        }

        match self.store.select(kind, RecordFilter::record(scope, id)).await {
            Ok(rows) => match rows.into_iter().next() {
                None => UnlockOutcome::NotFound,
                Some(current) => {
                    let command = LifecycleCommand::Unlock {
                        user: user.clone(),
                        force: bypass,
                    };
                    match RecordLifecycle::from(&current).apply(&command) {
                        // Not locked at all: nothing to release.
                        Ok(_) => UnlockOutcome::Released,
                        Err(_) => {
                            tracing::info!("Unlock refused, caller is not the lock owner");
                            UnlockOutcome::NotLockOwner
                        }
                    }
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read lock state");
                UnlockOutcome::Unavailable
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use exhibits_core::environment::AdminList;
    use exhibits_core::record::ExhibitId;
    use exhibits_testing::{InMemoryRecordStore, RecordBuilder, StoreOperation};

    fn setup(admins: &str) -> (InMemoryRecordStore, LockManager, Scope, RecordId) {
        let store = InMemoryRecordStore::new();
        let exhibit = ExhibitId::new("e1");
        store.add_exhibit(exhibit.clone(), false);
        let record = RecordBuilder::new(RecordKind::Heading, exhibit.clone()).uuid("h1").build();
        store.seed(record);
        let manager = LockManager::new(Arc::new(store.clone()), Arc::new(AdminList::parse(admins)));
        (store, manager, Scope::exhibit(exhibit), RecordId::new("h1"))
    }

    #[tokio::test]
    async fn test_lock_is_reentrant_for_holder() {
        let (store, locks, scope, id) = setup("");
        let alice = UserId::new("alice");

        assert_eq!(locks.lock(RecordKind::Heading, &scope, &id, &alice).await, LockOutcome::Acquired);
        assert_eq!(locks.lock(RecordKind::Heading, &scope, &id, &alice).await, LockOutcome::Acquired);
        let record = store.record(RecordKind::Heading, &id).unwrap();
        assert_eq!(record.locked_by_user, Some(alice));
    }

    #[tokio::test]
    async fn test_conflict_reports_holder() {
        let (_, locks, scope, id) = setup("");
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        locks.lock(RecordKind::Heading, &scope, &id, &alice).await;
        assert_eq!(
            locks.lock(RecordKind::Heading, &scope, &id, &bob).await,
            LockOutcome::Conflict { holder: alice }
        );
    }

    #[tokio::test]
    async fn test_missing_record_or_store_failure_is_unavailable() {
        let (store, locks, scope, _) = setup("");
        let alice = UserId::new("alice");

        assert_eq!(
            locks
                .lock(RecordKind::Heading, &scope, &RecordId::new("nope"), &alice)
                .await,
            LockOutcome::Unavailable
        );

        store.set_failing(StoreOperation::Update, true);
        assert_eq!(
            locks.lock(RecordKind::Heading, &scope, &RecordId::new("h1"), &alice).await,
            LockOutcome::Unavailable
        );
    }

    #[tokio::test]
    async fn test_only_owner_or_admin_may_unlock() {
        let (store, locks, scope, id) = setup("root");
        let alice = UserId::new("alice");

        locks.lock(RecordKind::Heading, &scope, &id, &alice).await;
        assert_eq!(
            locks
                .unlock(RecordKind::Heading, &scope, &id, &UserId::new("bob"), UnlockOptions::default())
                .await,
            UnlockOutcome::NotLockOwner
        );
        assert!(store.record(RecordKind::Heading, &id).unwrap().is_locked());

        assert_eq!(
            locks
                .unlock(RecordKind::Heading, &scope, &id, &UserId::new("root"), UnlockOptions::default())
                .await,
            UnlockOutcome::Released
        );
        assert!(!store.record(RecordKind::Heading, &id).unwrap().is_locked());
    }

    #[tokio::test]
    async fn test_forced_unlock_and_unlocking_free_record() {
        let (store, locks, scope, id) = setup("");
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        assert_eq!(
            locks
                .unlock(RecordKind::Heading, &scope, &id, &bob, UnlockOptions::default())
                .await,
            UnlockOutcome::Released
        );

        locks.lock(RecordKind::Heading, &scope, &id, &alice).await;
        assert_eq!(
            locks
                .unlock(RecordKind::Heading, &scope, &id, &bob, UnlockOptions::forced())
                .await,
            UnlockOutcome::Released
        );
        assert!(!store.record(RecordKind::Heading, &id).unwrap().is_locked());
    }

    #[tokio::test]
    async fn test_unlock_tells_missing_record_from_store_failure() {
        let (store, locks, scope, id) = setup("");
        let alice = UserId::new("alice");

        assert_eq!(
            locks
                .unlock(RecordKind::Heading, &scope, &RecordId::new("nope"), &alice, UnlockOptions::default())
                .await,
            UnlockOutcome::NotFound
        );

        store.set_failing(StoreOperation::Update, true);
        assert_eq!(
            locks
                .unlock(RecordKind::Heading, &scope, &id, &alice, UnlockOptions::default())
                .await,
            UnlockOutcome::Unavailable
        );
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(LockOutcome::Conflict {
            holder: UserId::new("alice"),
        })
        .unwrap();
        assert_eq!(json["status"], "conflict");
        assert_eq!(json["holder"], "alice");
    }
}
