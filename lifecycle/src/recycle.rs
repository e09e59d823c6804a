//! Recycle bin: listing, restoring and purging soft-deleted records.
//!
//! Records are addressed by exhibit and uuid only. A nested record carries
//! its container id, so callers never need to know it.

use crate::coordinator::title;
use crate::environment::LifecycleEnvironment;
use exhibits_core::lifecycle::{LifecycleCommand, RecordLifecycle};
use exhibits_core::record::{ExhibitId, Record, RecordId, RecordKind};
use exhibits_core::record_store::{RecordFilter, RecordPatch, Visibility};
use exhibits_core::response::ApiResponse;
use exhibits_core::LifecycleError;
use exhibits_runtime::metrics::LifecycleMetrics;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// One entry of the recycle bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecycledRecord {
    /// Record kind discriminator
    pub kind: RecordKind,
    /// The soft-deleted record
    pub record: Record,
}

/// Recycle bin over every record kind.
#[derive(Clone)]
pub struct RecycleManager {
    env: Arc<LifecycleEnvironment>,
}

impl RecycleManager {
    /// Create a recycle bin manager.
    #[must_use]
    pub const fn new(env: Arc<LifecycleEnvironment>) -> Self {
        Self { env }
    }

    /// Soft-deleted records of an exhibit, across kinds.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] if any table cannot be read.
    pub async fn entries(&self, exhibit_id: &ExhibitId) -> Result<Vec<RecycledRecord>, LifecycleError> {
        let mut entries = Vec::new();
        for kind in RecordKind::ALL {
            let filter = RecordFilter::exhibit(exhibit_id).with_visibility(Visibility::Deleted);
            let records = self.env.store.select(kind, filter).await?;
            entries.extend(records.into_iter().map(|record| RecycledRecord { kind, record }));
        }
        Ok(entries)
    }

    /// Recycle bin contents as a response.
    #[tracing::instrument(skip_all, fields(exhibit_id = %exhibit_id))]
    pub async fn recycled(&self, exhibit_id: &ExhibitId) -> ApiResponse {
        match self.entries(exhibit_id).await {
            Ok(entries) => ApiResponse::ok(
                "Recycled records",
                Value::Array(entries.iter().map(|entry| entry.record.to_json()).collect()),
            ),
            Err(e) => {
                tracing::error!(error = %e, "Failed to list recycled records");
                e.into_response()
            }
        }
    }

    /// Bring a record back as an unpublished draft. It is not re-indexed.
    ///
    /// A nested record cannot come back while its container is deleted.
    /// Restoring a container also restores the children deleted with it;
    /// children deleted on their own stay in the bin.
    #[tracing::instrument(skip_all, fields(kind = %kind, exhibit_id = %exhibit_id, record_id = %id))]
    pub async fn restore(&self, kind: RecordKind, exhibit_id: &ExhibitId, id: &RecordId) -> ApiResponse {
        let started = Instant::now();
        let response = match self.try_restore(kind, exhibit_id, id).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Restore failed");
                e.into_response()
            }
        };
        observe("restore", kind, started, &response);
        response
    }

    async fn try_restore(
        &self,
        kind: RecordKind,
        exhibit_id: &ExhibitId,
        id: &RecordId,
    ) -> Result<ApiResponse, LifecycleError> {
        let Some(record) = self.find_deleted(kind, exhibit_id, id).await? else {
            return Ok(not_in_bin(kind));
        };
        RecordLifecycle::from(&record).apply(&LifecycleCommand::Restore)?;

        // A restored nested record waits for its container to be published.
        let mut held_by_container = false;
        if let (Some(container_kind), Some(container)) = (kind.descriptor().container, &record.container) {
            let filter = RecordFilter::exhibit(exhibit_id)
                .with_uuid(container.clone())
                .with_visibility(Visibility::Any);
            let Some(container) = self
                .env
                .store
                .select(container_kind, filter)
                .await?
                .into_iter()
                .find(|c| !c.is_deleted)
            else {
                return Err(LifecycleError::bad_request(format!(
                    "Restore the {} containing this {} first",
                    container_kind.label(),
                    kind.label()
                )));
            };
            held_by_container = !container.is_published;
        }

        let restored = RecordPatch::new()
            .deleted(false)
            .published(false)
            .updated(self.env.clock.now(), None);
        if let Some(child) = kind.descriptor().child {
            let filter = RecordFilter::exhibit(exhibit_id)
                .with_container(id.clone())
                .with_visibility(Visibility::Deleted)
                .with_held_by_container(true);
            let children = self.env.store.update(child, filter, restored.clone()).await?;
            tracing::debug!(children, "Restored container children");
        }

        let filter = RecordFilter::exhibit(exhibit_id)
            .with_uuid(id.clone())
            .with_visibility(Visibility::Deleted);
        self.env
            .store
            .update(kind, filter, restored.held_by_container(held_by_container))
            .await?;

        tracing::info!("Record restored");
        Ok(ApiResponse::ok(format!("{} restored", title(kind)), Value::from(id.as_str())))
    }

    /// Permanently delete one recycled record (and a container's children).
    #[tracing::instrument(skip_all, fields(kind = %kind, exhibit_id = %exhibit_id, record_id = %id))]
    pub async fn delete_permanently(&self, kind: RecordKind, exhibit_id: &ExhibitId, id: &RecordId) -> ApiResponse {
        let started = Instant::now();
        let response = match self.try_delete_permanently(kind, exhibit_id, id).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "Permanent delete failed");
                e.into_response()
            }
        };
        observe("delete_permanently", kind, started, &response);
        response
    }

    async fn try_delete_permanently(
        &self,
        kind: RecordKind,
        exhibit_id: &ExhibitId,
        id: &RecordId,
    ) -> Result<ApiResponse, LifecycleError> {
        let Some(record) = self.find_deleted(kind, exhibit_id, id).await? else {
            return Ok(not_in_bin(kind));
        };
        RecordLifecycle::from(&record).apply(&LifecycleCommand::Purge)?;

        if let Some(child) = kind.descriptor().child {
            let filter = RecordFilter::exhibit(exhibit_id)
                .with_container(id.clone())
                .with_visibility(Visibility::Any);
            self.env.store.purge(child, filter).await?;
        }
        let filter = RecordFilter::exhibit(exhibit_id)
            .with_uuid(id.clone())
            .with_visibility(Visibility::Deleted);
        self.env.store.purge(kind, filter).await?;

        tracing::info!("Record permanently deleted");
        Ok(ApiResponse::no_content(format!("{} permanently deleted", title(kind))))
    }

    /// Empty the recycle bin of an exhibit.
    #[tracing::instrument(skip_all, fields(exhibit_id = %exhibit_id))]
    pub async fn delete_all(&self, exhibit_id: &ExhibitId) -> ApiResponse {
        match self.try_delete_all(exhibit_id).await {
            Ok(purged) => {
                tracing::info!(purged, "Recycle bin emptied");
                ApiResponse::ok("Recycle bin emptied", json!({ "purged": purged }))
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to empty recycle bin");
                e.into_response()
            }
        }
    }

    async fn try_delete_all(&self, exhibit_id: &ExhibitId) -> Result<u64, LifecycleError> {
        let mut purged = 0;

        // Children of deleted containers go with them, whatever their own state.
        for kind in RecordKind::ALL {
            let Some(child) = kind.descriptor().child else {
                continue;
            };
            let deleted = RecordFilter::exhibit(exhibit_id).with_visibility(Visibility::Deleted);
            for container in self.env.store.select(kind, deleted).await? {
                let filter = RecordFilter::exhibit(exhibit_id)
                    .with_container(container.uuid)
                    .with_visibility(Visibility::Any);
                purged += self.env.store.purge(child, filter).await?;
            }
        }

        for kind in RecordKind::ALL.into_iter().rev() {
            let filter = RecordFilter::exhibit(exhibit_id).with_visibility(Visibility::Deleted);
            purged += self.env.store.purge(kind, filter).await?;
        }
        Ok(purged)
    }

    async fn find_deleted(
        &self,
        kind: RecordKind,
        exhibit_id: &ExhibitId,
        id: &RecordId,
    ) -> Result<Option<Record>, LifecycleError> {
        if id.as_str().trim().is_empty() {
            return Err(LifecycleError::bad_request(format!("Missing {} id", kind.label())));
        }
        let filter = RecordFilter::exhibit(exhibit_id)
            .with_uuid(id.clone())
            .with_visibility(Visibility::Deleted);
        Ok(self.env.store.select(kind, filter).await?.into_iter().next())
    }
}

fn not_in_bin(kind: RecordKind) -> ApiResponse {
    ApiResponse::ok(format!("{} not found in recycle bin", title(kind)), Value::Null)
}

fn observe(operation: &'static str, kind: RecordKind, started: Instant, response: &ApiResponse) {
    let outcome = if response.is_success() { "ok" } else { "failed" };
    LifecycleMetrics::record_operation(operation, kind.as_str(), outcome, started.elapsed());
}
