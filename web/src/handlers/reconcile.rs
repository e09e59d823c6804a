//! On-demand store/index reconciliation.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use exhibits_core::record::ExhibitId;
use exhibits_lifecycle::{SweepMode, SweepReport};
use serde::Deserialize;

/// Query string of a sweep.
#[derive(Debug, Default, Deserialize)]
pub struct ReconcileQuery {
    /// Repair drift instead of only reporting it
    #[serde(default)]
    pub repair: bool,
}

/// `POST /reconcile/:exhibit_id[?repair=true]`
///
/// # Errors
///
/// Returns `500` when the record store cannot be read.
pub async fn reconcile(
    State(state): State<AppState>,
    Path(exhibit_id): Path<String>,
    Query(query): Query<ReconcileQuery>,
) -> Result<Json<SweepReport>, AppError> {
    let mode = if query.repair { SweepMode::Repair } else { SweepMode::ReportOnly };
    tracing::info!(exhibit_id = %exhibit_id, ?mode, "Reconciliation requested");

    let report = state
        .coordinator
        .reconciliation()
        .run(&ExhibitId::new(exhibit_id), mode)
        .await?;
    Ok(Json(report))
}
