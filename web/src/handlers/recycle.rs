//! Recycle bin routes.

use super::reply;
use crate::WebResult;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::Response,
};
use exhibits_core::record::{ExhibitId, RecordId, RecordKind};

/// `GET /recycle/:exhibit_id`
pub async fn list(State(state): State<AppState>, Path(exhibit_id): Path<String>) -> Response {
    reply(state.coordinator.recycle_bin().recycled(&ExhibitId::new(exhibit_id)).await)
}

/// `POST /recycle/:exhibit_id/:kind/:id/restore`
///
/// # Errors
///
/// Returns `400` for an unknown record type.
pub async fn restore(
    State(state): State<AppState>,
    Path((exhibit_id, kind, id)): Path<(String, String, String)>,
) -> WebResult<Response> {
    let kind: RecordKind = kind.parse()?;
    let response = state
        .coordinator
        .recycle_bin()
        .restore(kind, &ExhibitId::new(exhibit_id), &RecordId::new(id))
        .await;
    Ok(reply(response))
}

/// `DELETE /recycle/:exhibit_id/:kind/:id`
///
/// # Errors
///
/// Returns `400` for an unknown record type.
pub async fn delete_permanently(
    State(state): State<AppState>,
    Path((exhibit_id, kind, id)): Path<(String, String, String)>,
) -> WebResult<Response> {
    let kind: RecordKind = kind.parse()?;
    let response = state
        .coordinator
        .recycle_bin()
        .delete_permanently(kind, &ExhibitId::new(exhibit_id), &RecordId::new(id))
        .await;
    Ok(reply(response))
}

/// `DELETE /recycle/:exhibit_id`
pub async fn delete_all(State(state): State<AppState>, Path(exhibit_id): Path<String>) -> Response {
    reply(state.coordinator.recycle_bin().delete_all(&ExhibitId::new(exhibit_id)).await)
}
