//! Suppress-then-republish cycle triggered by edits.
//!
//! An edited record is pulled from the index right away and published again
//! after [`LifecycleConfig::republish_delay`](crate::LifecycleConfig), so the
//! index never serves the pre-edit content. The delayed publish is a keyed
//! task: a newer edit, an explicit publish or suppress, or a delete cancels
//! it. Only index and store failures of the delayed publish are retried.

use crate::coordinator::LifecycleCoordinator;
use exhibits_core::record::{RecordId, RecordKind, Scope};
use exhibits_core::schedule::{DeferredTask, TaskError, TaskKey};

/// What happened to the republish part of an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepublishOutcome {
    /// Suppressed now, publish scheduled.
    Scheduled,
    /// Suppress failed; nothing was scheduled and the record keeps its state.
    SuppressFailed(String),
    /// Suppressed, but the scheduler refused the task.
    NotScheduled(String),
}

impl LifecycleCoordinator {
    /// Suppress the record now and schedule its publication.
    ///
    /// Nothing is scheduled unless the suppress succeeded.
    #[tracing::instrument(skip_all, fields(kind = %kind, record_id = %id))]
    pub async fn republish(&self, kind: RecordKind, scope: &Scope, id: &RecordId) -> RepublishOutcome {
        let suppressed = self.suppress_record(kind, scope, id).await;
        if !suppressed.status {
            tracing::warn!(reason = %suppressed.message, "Suppress failed, republish not scheduled");
            return RepublishOutcome::SuppressFailed(suppressed.message);
        }

        let coordinator = self.clone();
        let scope = scope.clone();
        let record_id = id.clone();
        let task = DeferredTask::new(move || {
            let coordinator = coordinator.clone();
            let scope = scope.clone();
            let record_id = record_id.clone();
            async move {
                let ack = coordinator.publish_record(kind, &scope, &record_id).await;
                match ack.failure {
                    _ if ack.status => Ok(()),
                    Some(failure) if failure.is_transient() => Err(TaskError::Transient(ack.message)),
                    _ => Err(TaskError::Permanent(ack.message)),
                }
            }
        });

        let key = TaskKey::republish(kind, id);
        match self.env.scheduler.schedule(key, self.config.republish_delay, task) {
            Ok(()) => {
                tracing::debug!(delay_ms = self.config.republish_delay.as_millis(), "Republish scheduled");
                RepublishOutcome::Scheduled
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to schedule republish");
                RepublishOutcome::NotScheduled(e.to_string())
            }
        }
    }

    /// Drop the record's republish. Returns `true` if one had not finished.
    pub fn cancel_republish(&self, kind: RecordKind, id: &RecordId) -> bool {
        let cancelled = self.env.scheduler.cancel(&TaskKey::republish(kind, id));
        if cancelled {
            tracing::debug!(kind = %kind, record_id = %id, "Pending republish cancelled");
        }
        cancelled
    }
}
