//! The lifecycle coordinator: one implementation of create / read / update /
//! delete / publish / suppress / reorder for every record kind.
//!
//! Per-kind differences (table, container, nested children) come from the
//! kind's [`KindDescriptor`](exhibits_core::record::KindDescriptor).
//! Transitions are checked against [`RecordLifecycle`] before any I/O.
//!
//! Publish and suppress follow the same ordering: the search index is
//! mutated first and the store is committed only once the index confirmed.
//! If a publish store write fails after indexing, the index entry is removed
//! again.
//!
//! Cascades from a container mark the children they touch with
//! `held_by_container`. Publishing or restoring the container only brings
//! back children carrying that mark, so a child suppressed or deleted on its
//! own keeps that state.
//!
//! No operation returns `Err`. Failures become an [`ApiResponse`] or an
//! [`Ack`] with a status code and message.

use crate::environment::{LifecycleConfig, LifecycleEnvironment};
use crate::lock::{LockManager, LockOutcome, UnlockOptions, UnlockOutcome};
use crate::payload::Payload;
use crate::reconcile::ReconciliationSweep;
use crate::recycle::RecycleManager;
use crate::republish::RepublishOutcome;
use exhibits_core::lifecycle::{LifecycleCommand, RecordLifecycle, TransitionError};
use exhibits_core::record::{ExhibitId, Record, RecordId, RecordKind, Scope, Styles, UserId};
use exhibits_core::record_store::{LockChange, RecordFilter, RecordPatch, Visibility};
use exhibits_core::response::{Ack, AckFailure, ApiResponse};
use exhibits_core::validation::ValidationMode;
use exhibits_core::LifecycleError;
use exhibits_runtime::metrics::LifecycleMetrics;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// New position of one record among its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderItem {
    /// Record to move
    pub uuid: RecordId,
    /// New position
    pub order: i64,
}

/// Aggregate result of [`LifecycleCoordinator::reorder_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReorderReport {
    /// Number of records moved
    pub updated: usize,
    /// Records that could not be moved
    pub failed: Vec<RecordId>,
}

/// Drives the lifecycle of every record kind.
#[derive(Clone)]
pub struct LifecycleCoordinator {
    pub(crate) env: Arc<LifecycleEnvironment>,
    pub(crate) config: LifecycleConfig,
    locks: LockManager,
}

impl LifecycleCoordinator {
    /// Create a coordinator over `env`.
    #[must_use]
    pub fn new(env: LifecycleEnvironment, config: LifecycleConfig) -> Self {
        let locks = LockManager::new(Arc::clone(&env.store), Arc::clone(&env.authorizer));
        Self {
            env: Arc::new(env),
            config,
            locks,
        }
    }

    /// Injected collaborators.
    #[must_use]
    pub fn environment(&self) -> &LifecycleEnvironment {
        &self.env
    }

    /// Coordinator tunables.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// The lock manager used for edit locks.
    #[must_use]
    pub const fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Recycle bin sharing this coordinator's collaborators.
    #[must_use]
    pub fn recycle_bin(&self) -> RecycleManager {
        RecycleManager::new(Arc::clone(&self.env))
    }

    /// Reconciliation sweep sharing this coordinator's collaborators.
    #[must_use]
    pub fn reconciliation(&self) -> ReconciliationSweep {
        ReconciliationSweep::new(Arc::clone(&self.env))
    }

    /// Create a record at the end of its scope.
    ///
    /// Answers `201` with the new uuid, `400` for malformed or invalid
    /// payloads and `500` when the store fails.
    #[tracing::instrument(skip_all, fields(kind = %kind, exhibit_id = %scope.exhibit_id))]
    pub async fn create(&self, kind: RecordKind, scope: &Scope, body: Value, actor: Option<UserId>) -> ApiResponse {
        let started = Instant::now();
        let response = match self.try_create(kind, scope, body, actor).await {
            Ok(id) => {
                tracing::info!(record_id = %id, "Record created");
                ApiResponse::created(format!("{} record created", title(kind)), Value::from(id.as_str()))
            }
            Err(e) => failure_response("create", e),
        };
        observe("create", kind, started, &response);
        response
    }

    async fn try_create(
        &self,
        kind: RecordKind,
        scope: &Scope,
        body: Value,
        actor: Option<UserId>,
    ) -> Result<RecordId, LifecycleError> {
        check_scope(kind, scope)?;
        let payload = Payload::from_body(body)?;

        let mut held_by_container = false;
        if let Some(container_kind) = kind.descriptor().container {
            let Some(container) = self.container_of(kind, scope).await? else {
                return Err(LifecycleError::bad_request(format!("{} not found", title(container_kind))));
            };
            held_by_container = !container.is_published;
        }

        self.env
            .validator
            .validate(kind, ValidationMode::Create, &payload.content)
            .map_err(LifecycleError::Validation)?;
        let styles = Styles::normalize(payload.styles.as_ref())?;

        let order = self
            .env
            .store
            .max_order(kind, scope.clone())
            .await?
            .map_or(0, |max| max + 1);

        let record = Record {
            uuid: RecordId::generate(),
            kind,
            is_member_of_exhibit: scope.exhibit_id.clone(),
            container: scope.container.clone(),
            order,
            is_published: false,
            locked_by_user: None,
            is_deleted: false,
            held_by_container,
            styles,
            content: payload.content,
            created: self.env.clock.now(),
            created_by: actor.clone(),
            updated: None,
            updated_by: None,
        };
        let id = record.uuid.clone();
        self.env.store.insert(record).await?;

        self.touch_exhibit(scope.exhibit_id.clone(), actor);
        Ok(id)
    }

    /// Read one active record. Never takes a lock.
    ///
    /// A missing record is `200` with `null` data.
    #[tracing::instrument(skip_all, fields(kind = %kind, exhibit_id = %scope.exhibit_id, record_id = %id))]
    pub async fn get(&self, kind: RecordKind, scope: &Scope, id: &RecordId) -> ApiResponse {
        let started = Instant::now();
        let response = match self.find_active(kind, scope, id).await {
            Ok(Some(record)) => ApiResponse::ok(format!("{} record", title(kind)), record.to_json()),
            Ok(None) => ApiResponse::ok(format!("{} not found", title(kind)), Value::Null),
            Err(e) => {
                tracing::warn!(error = %e, "Record lookup failed");
                ApiResponse::bad_request(format!("Unable to get {} record: {e}", kind.label()), Value::Null)
            }
        };
        observe("get", kind, started, &response);
        response
    }

    /// Take the edit lock for `user`, then read the record.
    ///
    /// The read succeeds even when another editor holds the lock; `data.lock`
    /// tells the caller whether they may edit.
    #[tracing::instrument(skip_all, fields(kind = %kind, exhibit_id = %scope.exhibit_id, record_id = %id, user_id = %user))]
    pub async fn open_for_edit(&self, kind: RecordKind, scope: &Scope, id: &RecordId, user: &UserId) -> ApiResponse {
        let started = Instant::now();
        let lock = match check_target(kind, scope, id) {
            Ok(()) => self.locks.lock(kind, scope, id, user).await,
            Err(_) => LockOutcome::Unavailable,
        };
        let response = match self.find_active(kind, scope, id).await {
            Ok(Some(record)) => ApiResponse::ok(
                format!("{} record", title(kind)),
                json!({ "record": record.to_json(), "lock": lock }),
            ),
            Ok(None) => ApiResponse::ok(format!("{} not found", title(kind)), Value::Null),
            Err(e) => {
                tracing::warn!(error = %e, "Record lookup failed");
                ApiResponse::bad_request(format!("Unable to get {} record: {e}", kind.label()), Value::Null)
            }
        };
        observe("open_for_edit", kind, started, &response);
        response
    }

    /// Active records of a scope, in sibling order.
    #[tracing::instrument(skip_all, fields(kind = %kind, exhibit_id = %scope.exhibit_id))]
    pub async fn list(&self, kind: RecordKind, scope: &Scope) -> ApiResponse {
        let started = Instant::now();
        let result = async {
            check_scope(kind, scope)?;
            Ok::<_, LifecycleError>(self.env.store.select(kind, RecordFilter::scope(scope)).await?)
        }
        .await;
        let response = match result {
            Ok(records) => ApiResponse::ok(
                format!("{} records", title(kind)),
                Value::Array(records.iter().map(Record::to_json).collect()),
            ),
            Err(e) => failure_response("list", e),
        };
        observe("list", kind, started, &response);
        response
    }

    /// Update content and styles of an active record.
    ///
    /// Any pending republish is cancelled first. A truthy `is_published` in
    /// the body starts the suppress-then-republish cycle.
    #[tracing::instrument(skip_all, fields(kind = %kind, exhibit_id = %scope.exhibit_id, record_id = %id))]
    pub async fn update(
        &self,
        kind: RecordKind,
        scope: &Scope,
        id: &RecordId,
        body: Value,
        actor: Option<UserId>,
    ) -> ApiResponse {
        let started = Instant::now();
        let response = match self.try_update(kind, scope, id, body, actor).await {
            Ok(response) => response,
            Err(e) => failure_response("update", e),
        };
        observe("update", kind, started, &response);
        response
    }

    async fn try_update(
        &self,
        kind: RecordKind,
        scope: &Scope,
        id: &RecordId,
        body: Value,
        actor: Option<UserId>,
    ) -> Result<ApiResponse, LifecycleError> {
        check_target(kind, scope, id)?;
        let payload = Payload::from_body(body)?;
        self.env
            .validator
            .validate(kind, ValidationMode::Update, &payload.content)
            .map_err(LifecycleError::Validation)?;

        self.cancel_republish(kind, id);

        let mut patch = RecordPatch::new().updated(self.env.clock.now(), actor.clone());
        if !payload.content.is_empty() {
            patch = patch.content(payload.content);
        }
        if payload.styles.is_some() {
            patch = patch.styles(Styles::normalize(payload.styles.as_ref())?);
        }

        let affected = self
            .env
            .store
            .update(kind, RecordFilter::record(scope, id), patch)
            .await?;
        if affected == 0 {
            return Ok(ApiResponse::ok(format!("{} not found", title(kind)), Value::Null));
        }
        self.touch_exhibit(scope.exhibit_id.clone(), actor);

        let message = if payload.republish {
            match self.republish(kind, scope, id).await {
                RepublishOutcome::Scheduled => format!("{} record updated, republish scheduled", title(kind)),
                RepublishOutcome::SuppressFailed(reason) => {
                    format!("{} record updated, republish skipped: {reason}", title(kind))
                }
                RepublishOutcome::NotScheduled(reason) => {
                    format!("{} record updated and suppressed, republish not scheduled: {reason}", title(kind))
                }
            }
        } else {
            format!("{} record updated", title(kind))
        };

        Ok(ApiResponse::ok(message, Value::from(id.as_str())))
    }

    /// Move a record to the recycle bin.
    ///
    /// Idempotent: deleting an already deleted record answers `204` again.
    /// Index removal is best effort. Containers take their children along.
    #[tracing::instrument(skip_all, fields(kind = %kind, exhibit_id = %scope.exhibit_id, record_id = %id))]
    pub async fn delete(&self, kind: RecordKind, scope: &Scope, id: &RecordId) -> ApiResponse {
        let started = Instant::now();
        let response = match self.try_delete(kind, scope, id).await {
            Ok(()) => ApiResponse::no_content(format!("{} record deleted", title(kind))),
            Err(e) => failure_response("delete", e),
        };
        observe("delete", kind, started, &response);
        response
    }

    async fn try_delete(&self, kind: RecordKind, scope: &Scope, id: &RecordId) -> Result<(), LifecycleError> {
        check_target(kind, scope, id)?;
        self.cancel_republish(kind, id);
        self.remove_from_index(id).await;

        if let Some(child) = kind.descriptor().child {
            let children = self
                .env
                .store
                .select(child, children_of(&scope.exhibit_id, id))
                .await?;
            for record in &children {
                self.cancel_republish(child, &record.uuid);
                self.remove_from_index(&record.uuid).await;
            }
            if !children.is_empty() {
                self.env
                    .store
                    .update(
                        child,
                        children_of(&scope.exhibit_id, id),
                        soft_delete_patch().held_by_container(true),
                    )
                    .await?;
            }
        }

        let filter = RecordFilter::record(scope, id).with_visibility(Visibility::Any);
        let affected = self
            .env
            .store
            .update(kind, filter, soft_delete_patch().held_by_container(false))
            .await?;
        tracing::debug!(affected, "Record soft-deleted");
        Ok(())
    }

    /// Index the record, then mark it published.
    ///
    /// The exhibit (and the container, for nested kinds) must be published.
    /// Publishing a container also publishes the children it suppressed.
    /// A pending republish of the record is cancelled first.
    #[tracing::instrument(skip_all, fields(kind = %kind, exhibit_id = %scope.exhibit_id, record_id = %id))]
    pub async fn publish(&self, kind: RecordKind, scope: &Scope, id: &RecordId) -> Ack {
        self.cancel_republish(kind, id);
        self.publish_record(kind, scope, id).await
    }

    /// Publish without touching the record's pending republish.
    pub(crate) async fn publish_record(&self, kind: RecordKind, scope: &Scope, id: &RecordId) -> Ack {
        let started = Instant::now();
        let ack = match self.try_publish(kind, scope, id).await {
            Ok(ack) => ack,
            Err(e) => {
                tracing::warn!(error = %e, "Publish failed");
                Ack::failure(e.ack_failure(), format!("Unable to publish {}. {e}", kind.label()))
            }
        };
        observe_ack("publish", kind, started, &ack);
        ack
    }

    async fn try_publish(&self, kind: RecordKind, scope: &Scope, id: &RecordId) -> Result<Ack, LifecycleError> {
        check_target(kind, scope, id)?;
        let label = kind.label();
        let Some(record) = self.find_active(kind, scope, id).await? else {
            return Ok(Ack::failure(
                AckFailure::NotFound,
                format!("Unable to publish {label}. Record not found"),
            ));
        };

        let exhibit_published = self
            .env
            .store
            .exhibit(scope.exhibit_id.clone())
            .await?
            .is_some_and(|exhibit| exhibit.is_published);
        let container_published = if kind.is_nested() {
            Some(self.container_of(kind, scope).await?.is_some_and(|c| c.is_published))
        } else {
            None
        };

        let command = LifecycleCommand::Publish {
            exhibit_published,
            container_published,
        };
        if let Err(e) = RecordLifecycle::from(&record).apply(&command) {
            tracing::info!(reason = %e, "Publish rejected");
            return Ok(Ack::failure(AckFailure::Refused, publish_rejection(kind, &e)));
        }

        if let Err(e) = self.publish_one(kind, &scope.exhibit_id, &RecordFilter::record(scope, id), id).await {
            return Ok(Ack::failure(e.ack_failure(), format!("Unable to publish {label}. {e}")));
        }

        if let Some(child) = kind.descriptor().child {
            self.publish_children(child, &scope.exhibit_id, id).await;
        }

        tracing::info!("Record published");
        Ok(Ack::success(format!("{} published", title(kind))))
    }

    /// Index first, then commit the flag; undo the index entry if the commit fails.
    async fn publish_one(
        &self,
        kind: RecordKind,
        exhibit_id: &ExhibitId,
        filter: &RecordFilter,
        id: &RecordId,
    ) -> Result<(), LifecycleError> {
        self.env
            .index
            .index_record(kind, exhibit_id.clone(), id.clone())
            .await?;

        let committed = self
            .env
            .store
            .update(
                kind,
                filter.clone(),
                RecordPatch::new().published(true).held_by_container(false),
            )
            .await;
        match committed {
            Ok(n) if n > 0 => Ok(()),
            other => {
                let err = match other {
                    Err(e) => LifecycleError::from(e),
                    // Deleted between the read and the commit.
                    Ok(_) => LifecycleError::from(TransitionError::Deleted),
                };
                tracing::warn!(record_id = %id, error = %err, "Store write failed after indexing, removing index entry");
                LifecycleMetrics::record_compensation(kind.as_str());
                if let Err(e) = self.env.index.delete_record(id.clone()).await {
                    tracing::error!(record_id = %id, error = %e, "Compensating index delete failed, index has drifted");
                }
                Err(err)
            }
        }
    }

    /// Publish the children held back by this container.
    async fn publish_children(&self, child: RecordKind, exhibit_id: &ExhibitId, container: &RecordId) {
        let held = children_of(exhibit_id, container).with_held_by_container(true);
        let children = match self.env.store.select(child, held).await {
            Ok(children) => children,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load children for publish");
                return;
            }
        };
        for record in children.iter().filter(|r| !r.is_published) {
            let filter = children_of(exhibit_id, container).with_uuid(record.uuid.clone());
            if let Err(e) = self.publish_one(child, exhibit_id, &filter, &record.uuid).await {
                tracing::warn!(record_id = %record.uuid, error = %e, "Failed to publish child record");
            }
        }
    }

    /// Remove the record from the index, then mark it unpublished.
    ///
    /// An index failure leaves the store untouched. A pending republish of
    /// the record is cancelled first, so the suppression sticks.
    #[tracing::instrument(skip_all, fields(kind = %kind, exhibit_id = %scope.exhibit_id, record_id = %id))]
    pub async fn suppress(&self, kind: RecordKind, scope: &Scope, id: &RecordId) -> Ack {
        self.cancel_republish(kind, id);
        self.suppress_record(kind, scope, id).await
    }

    /// Suppress without touching the record's pending republish.
    pub(crate) async fn suppress_record(&self, kind: RecordKind, scope: &Scope, id: &RecordId) -> Ack {
        let started = Instant::now();
        let ack = match self.try_suppress(kind, scope, id).await {
            Ok(ack) => ack,
            Err(e) => {
                tracing::warn!(error = %e, "Suppress failed");
                Ack::failure(e.ack_failure(), format!("Unable to suppress {}. {e}", kind.label()))
            }
        };
        observe_ack("suppress", kind, started, &ack);
        ack
    }

    async fn try_suppress(&self, kind: RecordKind, scope: &Scope, id: &RecordId) -> Result<Ack, LifecycleError> {
        check_target(kind, scope, id)?;
        let Some(record) = self.find_active(kind, scope, id).await? else {
            return Ok(Ack::failure(
                AckFailure::NotFound,
                format!("Unable to suppress {}. Record not found", kind.label()),
            ));
        };
        RecordLifecycle::from(&record).apply(&LifecycleCommand::Suppress)?;

        self.env.index.delete_record(id.clone()).await?;
        self.env
            .store
            .update(
                kind,
                RecordFilter::record(scope, id),
                RecordPatch::new().published(false).held_by_container(false),
            )
            .await?;

        if let Some(child) = kind.descriptor().child {
            self.suppress_children(child, &scope.exhibit_id, id).await;
        }

        tracing::info!("Record suppressed");
        Ok(Ack::success(format!("{} suppressed", title(kind))))
    }

    async fn suppress_children(&self, child: RecordKind, exhibit_id: &ExhibitId, container: &RecordId) {
        let filter = children_of(exhibit_id, container).with_published(true);
        let children = match self.env.store.select(child, filter).await {
            Ok(children) => children,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load children for suppress");
                return;
            }
        };
        for record in &children {
            if let Err(e) = self.env.index.delete_record(record.uuid.clone()).await {
                tracing::warn!(record_id = %record.uuid, error = %e, "Failed to remove child from index");
                continue;
            }
            let filter = children_of(exhibit_id, container).with_uuid(record.uuid.clone());
            if let Err(e) = self
                .env
                .store
                .update(child, filter, RecordPatch::new().published(false).held_by_container(true))
                .await
            {
                tracing::warn!(record_id = %record.uuid, error = %e, "Failed to suppress child record");
            }
        }
    }

    /// Move one record to a new position. Returns `false` on failure.
    #[tracing::instrument(skip_all, fields(kind = %kind, exhibit_id = %scope.exhibit_id, record_id = %item.uuid))]
    pub async fn reorder(&self, kind: RecordKind, scope: &Scope, item: &ReorderItem) -> bool {
        if check_target(kind, scope, &item.uuid).is_err() {
            return false;
        }
        match self
            .env
            .store
            .update(kind, RecordFilter::record(scope, &item.uuid), RecordPatch::new().order(item.order))
            .await
        {
            Ok(affected) => affected > 0,
            Err(e) => {
                tracing::warn!(error = %e, "Reorder failed");
                false
            }
        }
    }

    /// Move several siblings. Each move is independent; failures are collected.
    #[tracing::instrument(skip_all, fields(kind = %kind, exhibit_id = %scope.exhibit_id, items = items.len()))]
    pub async fn reorder_all(&self, kind: RecordKind, scope: &Scope, items: &[ReorderItem]) -> ReorderReport {
        let started = Instant::now();
        let results = futures::future::join_all(
            items
                .iter()
                .map(|item| async move { (item.uuid.clone(), self.reorder(kind, scope, item).await) }),
        )
        .await;

        let mut report = ReorderReport::default();
        for (uuid, moved) in results {
            if moved {
                report.updated += 1;
            } else {
                report.failed.push(uuid);
            }
        }
        if !report.failed.is_empty() {
            tracing::warn!(failed = report.failed.len(), "Some records could not be reordered");
        }
        let outcome = if report.failed.is_empty() { "ok" } else { "failed" };
        LifecycleMetrics::record_operation("reorder", kind.as_str(), outcome, started.elapsed());
        report
    }

    /// Release the edit lock through the lock manager.
    #[tracing::instrument(skip_all, fields(kind = %kind, exhibit_id = %scope.exhibit_id, record_id = %id, user_id = %user))]
    pub async fn unlock(
        &self,
        kind: RecordKind,
        scope: &Scope,
        id: &RecordId,
        user: &UserId,
        options: UnlockOptions,
    ) -> Ack {
        let started = Instant::now();
        let ack = if let Err(e) = check_target(kind, scope, id) {
            Ack::failure(e.ack_failure(), e.to_string())
        } else {
            match self.locks.unlock(kind, scope, id, user, options).await {
                UnlockOutcome::Released => Ack::success(format!("{} unlocked", title(kind))),
                UnlockOutcome::NotLockOwner => {
                    Ack::failure(AckFailure::Refused, TransitionError::NotLockOwner.to_string())
                }
                UnlockOutcome::NotFound => Ack::failure(
                    AckFailure::NotFound,
                    format!("Unable to unlock {}. Record not found", kind.label()),
                ),
                UnlockOutcome::Unavailable => {
                    Ack::failure(AckFailure::Store, format!("Unable to unlock {}", kind.label()))
                }
            }
        };
        observe_ack("unlock", kind, started, &ack);
        ack
    }

    pub(crate) async fn find_active(
        &self,
        kind: RecordKind,
        scope: &Scope,
        id: &RecordId,
    ) -> Result<Option<Record>, LifecycleError> {
        check_target(kind, scope, id)?;
        Ok(self
            .env
            .store
            .select(kind, RecordFilter::record(scope, id))
            .await?
            .into_iter()
            .next())
    }

    /// The active container a nested scope points at.
    async fn container_of(&self, kind: RecordKind, scope: &Scope) -> Result<Option<Record>, LifecycleError> {
        let (Some(container_kind), Some(container)) = (kind.descriptor().container, &scope.container) else {
            return Ok(None);
        };
        let filter = RecordFilter::exhibit(&scope.exhibit_id).with_uuid(container.clone());
        Ok(self
            .env
            .store
            .select(container_kind, filter)
            .await?
            .into_iter()
            .next())
    }

    async fn remove_from_index(&self, id: &RecordId) {
        if let Err(e) = self.env.index.delete_record(id.clone()).await {
            tracing::warn!(record_id = %id, error = %e, "Failed to remove record from search index");
        }
    }

    /// Stamp the exhibit as updated without holding up the caller.
    fn touch_exhibit(&self, exhibit_id: ExhibitId, actor: Option<UserId>) {
        let store = Arc::clone(&self.env.store);
        let at = self.env.clock.now();
        tokio::spawn(async move {
            if let Err(e) = store.touch_exhibit(exhibit_id.clone(), at, actor).await {
                tracing::warn!(exhibit_id = %exhibit_id, error = %e, "Failed to update exhibit timestamp");
            }
        });
    }
}

/// Label with a leading capital ("Heading", "Grid item").
pub(crate) fn title(kind: RecordKind) -> String {
    let label = kind.label();
    let mut chars = label.chars();
    chars
        .next()
        .map(|first| first.to_ascii_uppercase().to_string() + chars.as_str())
        .unwrap_or_default()
}

fn publish_rejection(kind: RecordKind, err: &TransitionError) -> String {
    let label = kind.label();
    match (err, kind.descriptor().container) {
        (TransitionError::ContainerNotPublished, Some(container)) => {
            format!("Unable to publish {label}. {} must be published first", title(container))
        }
        _ => format!("Unable to publish {label}. {err}"),
    }
}

pub(crate) fn check_scope(kind: RecordKind, scope: &Scope) -> Result<(), LifecycleError> {
    if scope.exhibit_id.as_str().trim().is_empty() {
        return Err(LifecycleError::bad_request("Missing exhibit id"));
    }
    if !scope.fits(kind) {
        return Err(LifecycleError::bad_request(if kind.is_nested() {
            format!("A {} must belong to a container", kind.label())
        } else {
            format!("A {} cannot belong to a container", kind.label())
        }));
    }
    if scope.container.as_ref().is_some_and(|c| c.as_str().trim().is_empty()) {
        return Err(LifecycleError::bad_request("Missing container id"));
    }
    Ok(())
}

pub(crate) fn check_target(kind: RecordKind, scope: &Scope, id: &RecordId) -> Result<(), LifecycleError> {
    check_scope(kind, scope)?;
    if id.as_str().trim().is_empty() {
        return Err(LifecycleError::bad_request(format!("Missing {} id", kind.label())));
    }
    Ok(())
}

/// Active children of a container.
pub(crate) fn children_of(exhibit_id: &ExhibitId, container: &RecordId) -> RecordFilter {
    RecordFilter::exhibit(exhibit_id).with_container(container.clone())
}

fn soft_delete_patch() -> RecordPatch {
    RecordPatch::new()
        .deleted(true)
        .published(false)
        .lock(LockChange::Release)
}

fn failure_response(operation: &'static str, err: LifecycleError) -> ApiResponse {
    match &err {
        LifecycleError::Validation(_) | LifecycleError::BadRequest(_) | LifecycleError::Transition(_) => {
            tracing::debug!(operation, error = %err, "Request rejected");
        }
        LifecycleError::Store(_) | LifecycleError::Index(_) => {
            tracing::error!(operation, error = %err, "Operation failed");
        }
    }
    err.into_response()
}

fn observe(operation: &'static str, kind: RecordKind, started: Instant, response: &ApiResponse) {
    let outcome = match response.status {
        200..=299 => "ok",
        400..=499 => "rejected",
        _ => "failed",
    };
    LifecycleMetrics::record_operation(operation, kind.as_str(), outcome, started.elapsed());
}

fn observe_ack(operation: &'static str, kind: RecordKind, started: Instant, ack: &Ack) {
    let outcome = match ack.failure {
        _ if ack.status => "ok",
        Some(failure) if failure.is_transient() => "failed",
        _ => "rejected",
    };
    LifecycleMetrics::record_operation(operation, kind.as_str(), outcome, started.elapsed());
}
