//! HTTP request handlers.
//!
//! Record and recycle handlers translate lifecycle results into HTTP
//! responses with [`reply`] and [`acknowledge`].

pub mod health;
pub mod reconcile;
pub mod records;
pub mod recycle;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use exhibits_core::{Ack, ApiResponse};

pub use health::{health_check, readiness};

/// Answer with the response's own status code; `204` carries no body.
pub(crate) fn reply(response: ApiResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    (status, Json(response)).into_response()
}

/// `200` for a positive acknowledgement. A negative one answers by failure
/// class: `409` refused, `404` missing, `500` store, `502` search index.
pub(crate) fn acknowledge(ack: Ack) -> Response {
    let status = StatusCode::from_u16(ack.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ack)).into_response()
}
