//! On-demand consistency check between store publication flags and the
//! search index.
//!
//! Store and index are written without a shared transaction, so they can
//! drift (a crash between the two writes, a failed compensation, manual
//! changes to the index). The sweep compares `is_published` of every active
//! record with index membership and optionally repairs the index side.

use crate::environment::LifecycleEnvironment;
use exhibits_core::record::{ExhibitId, Record, RecordId, RecordKind};
use exhibits_core::record_store::RecordFilter;
use exhibits_core::LifecycleError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Whether the sweep only reports or also fixes the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    /// Report drift only
    #[default]
    ReportOnly,
    /// Re-index or de-index drifted records
    Repair,
}

/// One record whose index membership disagrees with its store flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drift {
    /// Record kind
    pub kind: RecordKind,
    /// Record id
    pub uuid: RecordId,
    /// `true` when the store says published but the index lacks the record
    pub expected_in_index: bool,
    /// Whether a repair was attempted and succeeded
    pub repaired: bool,
}

/// Result of one sweep over an exhibit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Exhibit swept
    pub exhibit_id: ExhibitId,
    /// Number of records compared
    pub checked: usize,
    /// Records found out of sync
    pub drift: Vec<Drift>,
    /// Records the index could not answer or repair for
    pub errors: Vec<String>,
}

impl SweepReport {
    /// Whether store and index agreed everywhere and nothing failed.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.drift.is_empty() && self.errors.is_empty()
    }
}

/// Compares store flags against index membership.
#[derive(Clone)]
pub struct ReconciliationSweep {
    env: Arc<LifecycleEnvironment>,
}

impl ReconciliationSweep {
    /// Create a sweep over `env`.
    #[must_use]
    pub const fn new(env: Arc<LifecycleEnvironment>) -> Self {
        Self { env }
    }

    /// Sweep every active record of an exhibit.
    ///
    /// Index failures on single records are collected in the report.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] if a table cannot be read.
    #[tracing::instrument(skip(self), fields(exhibit_id = %exhibit_id))]
    pub async fn run(&self, exhibit_id: &ExhibitId, mode: SweepMode) -> Result<SweepReport, LifecycleError> {
        let mut report = SweepReport {
            exhibit_id: exhibit_id.clone(),
            checked: 0,
            drift: Vec::new(),
            errors: Vec::new(),
        };

        for kind in RecordKind::ALL {
            let records = self.env.store.select(kind, RecordFilter::exhibit(exhibit_id)).await?;
            for record in records {
                report.checked += 1;
                self.check(&record, mode, &mut report).await;
            }
        }

        if report.is_consistent() {
            tracing::info!(checked = report.checked, "Store and index are consistent");
        } else {
            tracing::warn!(
                checked = report.checked,
                drift = report.drift.len(),
                errors = report.errors.len(),
                "Store and index have drifted"
            );
        }
        Ok(report)
    }

    async fn check(&self, record: &Record, mode: SweepMode, report: &mut SweepReport) {
        let indexed = match self.env.index.contains(record.uuid.clone()).await {
            Ok(indexed) => indexed,
            Err(e) => {
                report.errors.push(format!("{}: {e}", record.uuid));
                return;
            }
        };
        if indexed == record.is_published {
            return;
        }

        let repaired = match mode {
            SweepMode::ReportOnly => false,
            SweepMode::Repair => {
                let result = if record.is_published {
                    self.env
                        .index
                        .index_record(record.kind, record.is_member_of_exhibit.clone(), record.uuid.clone())
                        .await
                } else {
                    self.env.index.delete_record(record.uuid.clone()).await
                };
                match result {
                    Ok(()) => true,
                    Err(e) => {
                        report.errors.push(format!("{}: {e}", record.uuid));
                        false
                    }
                }
            }
        };

        tracing::debug!(kind = %record.kind, record_id = %record.uuid, repaired, "Index drift");
        report.drift.push(Drift {
            kind: record.kind,
            uuid: record.uuid.clone(),
            expected_in_index: record.is_published,
            repaired,
        });
    }
}
