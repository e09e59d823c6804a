//! Structured operation results.
//!
//! Coordinator operations never fail with an `Err`: every outcome is one of
//! these response shapes carrying an HTTP-style status code.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP-style status codes used by lifecycle responses.
pub mod status {
    /// Read or update succeeded
    pub const OK: u16 = 200;
    /// Record created
    pub const CREATED: u16 = 201;
    /// Record deleted
    pub const NO_CONTENT: u16 = 204;
    /// Validation failure or malformed request
    pub const BAD_REQUEST: u16 = 400;
    /// Record missing or in the recycle bin
    pub const NOT_FOUND: u16 = 404;
    /// Refused by the record's state (lock, unpublished exhibit or container)
    pub const CONFLICT: u16 = 409;
    /// Record store failure
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
    /// Search index failure
    pub const BAD_GATEWAY: u16 = 502;
}

/// Result of a create, read, update or delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// HTTP-style status code
    pub status: u16,
    /// Human-readable outcome
    pub message: String,
    /// Payload (record, uuid, issues, ...), `null` when there is none
    #[serde(default)]
    pub data: Value,
}

impl ApiResponse {
    /// Build a response.
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>, data: Value) -> Self {
        Self {
            status,
            message: message.into(),
            data,
        }
    }

    /// `200` with a payload.
    #[must_use]
    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self::new(status::OK, message, data)
    }

    /// `201` with a payload.
    #[must_use]
    pub fn created(message: impl Into<String>, data: Value) -> Self {
        Self::new(status::CREATED, message, data)
    }

    /// `204` without payload.
    #[must_use]
    pub fn no_content(message: impl Into<String>) -> Self {
        Self::new(status::NO_CONTENT, message, Value::Null)
    }

    /// `400` with an optional payload (validation issues).
    #[must_use]
    pub fn bad_request(message: impl Into<String>, data: Value) -> Self {
        Self::new(status::BAD_REQUEST, message, data)
    }

    /// `500` without payload.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(status::INTERNAL_SERVER_ERROR, message, Value::Null)
    }

    /// `502` without payload.
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(status::BAD_GATEWAY, message, Value::Null)
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Class of a negative [`Ack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckFailure {
    /// Malformed request
    Invalid,
    /// Record missing or deleted
    NotFound,
    /// The record's state does not allow it
    Refused,
    /// Record store failure
    Store,
    /// Search index failure
    Index,
}

impl AckFailure {
    /// HTTP-style status code of this failure class.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::Invalid => status::BAD_REQUEST,
            Self::NotFound => status::NOT_FOUND,
            Self::Refused => status::CONFLICT,
            Self::Store => status::INTERNAL_SERVER_ERROR,
            Self::Index => status::BAD_GATEWAY,
        }
    }

    /// Whether the same request may succeed once infrastructure recovers.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Store | Self::Index)
    }
}

/// Boolean acknowledgement for publish, suppress and unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Whether the operation took effect
    pub status: bool,
    /// Human-readable outcome
    pub message: String,
    /// Failure class, set when `status` is `false`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<AckFailure>,
}

impl Ack {
    /// Successful acknowledgement.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
            failure: None,
        }
    }

    /// Failed acknowledgement of the given class.
    #[must_use]
    pub fn failure(failure: AckFailure, message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
            failure: Some(failure),
        }
    }

    /// HTTP-style status code: `200` on success, otherwise the failure's code.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match (self.status, self.failure) {
            (true, _) => status::OK,
            (false, Some(failure)) => failure.status(),
            (false, None) => status::CONFLICT,
        }
    }
}
