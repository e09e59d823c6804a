//! Router assembly.

use crate::handlers::{health, reconcile, records, recycle};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

/// Build the full HTTP surface over `state`.
///
/// ```text
/// /api/v1/exhibits/:exhibit_id/:kind                              POST create, GET list, PUT reorder
/// /api/v1/exhibits/:exhibit_id/:kind/:id                          GET read, PUT update, DELETE delete
/// /api/v1/exhibits/:exhibit_id/:kind/:id/{publish,suppress,unlock} POST
/// /api/v1/exhibits/:exhibit_id/:kind/:id/items[/:item_id[/...]]   same, for items of grids and timelines
/// /api/v1/recycle/:exhibit_id                                     GET list, DELETE purge all
/// /api/v1/recycle/:exhibit_id/:kind/:id                           DELETE purge one
/// /api/v1/recycle/:exhibit_id/:kind/:id/restore                   POST
/// /api/v1/reconcile/:exhibit_id                                   POST
/// /health, /health/ready                                          GET
/// ```
pub fn router(state: AppState) -> Router {
    let records = Router::new()
        .route("/:kind", post(records::create).get(records::list).put(records::reorder))
        .route("/:kind/:id", get(records::read).put(records::update).delete(records::delete))
        .route("/:kind/:id/publish", post(records::publish))
        .route("/:kind/:id/suppress", post(records::suppress))
        .route("/:kind/:id/unlock", post(records::unlock))
        .route("/:kind/:id/items", post(records::create).get(records::list).put(records::reorder))
        .route(
            "/:kind/:id/items/:item_id",
            get(records::read).put(records::update).delete(records::delete),
        )
        .route("/:kind/:id/items/:item_id/publish", post(records::publish))
        .route("/:kind/:id/items/:item_id/suppress", post(records::suppress))
        .route("/:kind/:id/items/:item_id/unlock", post(records::unlock));

    let recycle_bin = Router::new()
        .route("/", get(recycle::list).delete(recycle::delete_all))
        .route("/:kind/:id", delete(recycle::delete_permanently))
        .route("/:kind/:id/restore", post(recycle::restore));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness))
        .nest("/api/v1/exhibits/:exhibit_id", records)
        .nest("/api/v1/recycle/:exhibit_id", recycle_bin)
        .route("/api/v1/reconcile/:exhibit_id", post(reconcile::reconcile))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
