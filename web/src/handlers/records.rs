//! Record routes, shared by top-level kinds and items of grids and timelines.

use super::{acknowledge, reply};
use crate::{AppError, WebResult};
use crate::extractors::{ActingUser, RecordCollection, RecordMember};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
    response::Response,
};
use exhibits_core::record::UserId;
use exhibits_lifecycle::{ReorderItem, ReorderReport, UnlockOptions};
use serde::Deserialize;
use serde_json::Value;

/// Query string of a record read.
#[derive(Debug, Default, Deserialize)]
pub struct ReadQuery {
    /// `edit` opens the record for editing and takes the lock
    #[serde(rename = "type")]
    pub mode: Option<String>,
    /// Editing user, when not given by header
    pub uid: Option<String>,
}

/// Query string of an unlock.
#[derive(Debug, Default, Deserialize)]
pub struct UnlockQuery {
    /// Release regardless of holder
    #[serde(default)]
    pub force: bool,
    /// Releasing user, when not given by header
    pub uid: Option<String>,
}

/// `POST` a new record into a collection.
pub async fn create(
    State(state): State<AppState>,
    target: RecordCollection,
    ActingUser(actor): ActingUser,
    Json(body): Json<Value>,
) -> Response {
    reply(state.coordinator.create(target.kind, &target.scope, body, actor).await)
}

/// `GET` the active records of a collection.
pub async fn list(State(state): State<AppState>, target: RecordCollection) -> Response {
    reply(state.coordinator.list(target.kind, &target.scope).await)
}

/// `PUT` new positions for records of a collection.
pub async fn reorder(
    State(state): State<AppState>,
    target: RecordCollection,
    Json(items): Json<Vec<ReorderItem>>,
) -> Json<ReorderReport> {
    Json(state.coordinator.reorder_all(target.kind, &target.scope, &items).await)
}

/// `GET` one record; `?type=edit` also takes the edit lock.
///
/// # Errors
///
/// Returns `400` when an edit read names no user.
pub async fn read(
    State(state): State<AppState>,
    target: RecordMember,
    ActingUser(actor): ActingUser,
    Query(query): Query<ReadQuery>,
) -> WebResult<Response> {
    if query.mode.as_deref() == Some("edit") {
        let user = editor(query.uid, actor)?;
        let response = state
            .coordinator
            .open_for_edit(target.kind, &target.scope, &target.id, &user)
            .await;
        return Ok(reply(response));
    }
    Ok(reply(state.coordinator.get(target.kind, &target.scope, &target.id).await))
}

/// `PUT` changes to one record.
pub async fn update(
    State(state): State<AppState>,
    target: RecordMember,
    ActingUser(actor): ActingUser,
    Json(body): Json<Value>,
) -> Response {
    reply(
        state
            .coordinator
            .update(target.kind, &target.scope, &target.id, body, actor)
            .await,
    )
}

/// `DELETE` one record into the recycle bin.
pub async fn delete(State(state): State<AppState>, target: RecordMember) -> Response {
    reply(state.coordinator.delete(target.kind, &target.scope, &target.id).await)
}

/// `POST .../publish`
pub async fn publish(State(state): State<AppState>, target: RecordMember) -> Response {
    acknowledge(state.coordinator.publish(target.kind, &target.scope, &target.id).await)
}

/// `POST .../suppress`
pub async fn suppress(State(state): State<AppState>, target: RecordMember) -> Response {
    acknowledge(state.coordinator.suppress(target.kind, &target.scope, &target.id).await)
}

/// `POST .../unlock`, optionally `?force=true`.
///
/// # Errors
///
/// Returns `400` when the request names no user.
pub async fn unlock(
    State(state): State<AppState>,
    target: RecordMember,
    ActingUser(actor): ActingUser,
    Query(query): Query<UnlockQuery>,
) -> WebResult<Response> {
    let user = editor(query.uid, actor)?;
    let options = UnlockOptions { force: query.force };
    let ack = state
        .coordinator
        .unlock(target.kind, &target.scope, &target.id, &user, options)
        .await;
    Ok(acknowledge(ack))
}

fn editor(uid: Option<String>, actor: Option<UserId>) -> Result<UserId, AppError> {
    uid.filter(|uid| !uid.trim().is_empty())
        .map(UserId::new)
        .or(actor)
        .ok_or_else(|| AppError::bad_request("A user id is required to edit records"))
}
