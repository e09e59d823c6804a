//! Lifecycle errors and their mapping onto response status codes.

use crate::lifecycle::TransitionError;
use crate::record::{InvalidStyles, UnknownKind};
use crate::record_store::RecordStoreError;
use crate::response::{status, AckFailure, ApiResponse};
use crate::search_index::SearchIndexError;
use crate::validation::ValidationIssue;
use serde_json::Value;
use thiserror::Error;

/// Internal error type of lifecycle operations.
///
/// Operations convert it into an [`ApiResponse`] at their boundary, keeping
/// validation failures (`400`) apart from persistence failures (`500`) and
/// search index failures (`502`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    /// Payload failed schema validation.
    #[error("Validation failed")]
    Validation(Vec<ValidationIssue>),

    /// Request was malformed (missing ids, wrong scope, empty body).
    #[error("{0}")]
    BadRequest(String),

    /// Transition not allowed from the record's current state.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Record store failure.
    #[error(transparent)]
    Store(#[from] RecordStoreError),

    /// Search index failure.
    #[error(transparent)]
    Index(#[from] SearchIndexError),
}

impl LifecycleError {
    /// Shorthand for [`LifecycleError::BadRequest`].
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Status code this error maps onto.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::BadRequest(_) | Self::Transition(_) => status::BAD_REQUEST,
            Self::Store(_) => status::INTERNAL_SERVER_ERROR,
            Self::Index(_) => status::BAD_GATEWAY,
        }
    }

    /// Class of the negative acknowledgement this error becomes.
    #[must_use]
    pub const fn ack_failure(&self) -> AckFailure {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => AckFailure::Invalid,
            Self::Transition(TransitionError::Deleted) => AckFailure::NotFound,
            Self::Transition(_) => AckFailure::Refused,
            Self::Store(_) => AckFailure::Store,
            Self::Index(_) => AckFailure::Index,
        }
    }

    /// Convert into a response; validation issues become the payload.
    #[must_use]
    pub fn into_response(self) -> ApiResponse {
        let status = self.status();
        match self {
            Self::Validation(issues) => ApiResponse::new(
                status,
                "Validation failed",
                serde_json::to_value(issues).unwrap_or(Value::Null),
            ),
            other => ApiResponse::new(status, other.to_string(), Value::Null),
        }
    }
}

impl From<InvalidStyles> for LifecycleError {
    fn from(err: InvalidStyles) -> Self {
        Self::Validation(vec![ValidationIssue::new("styles", err.to_string())])
    }
}

impl From<UnknownKind> for LifecycleError {
    fn from(err: UnknownKind) -> Self {
        Self::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordId;

    #[test]
    fn test_status_mapping_keeps_failure_classes_apart() {
        assert_eq!(LifecycleError::Validation(vec![]).status(), 400);
        assert_eq!(LifecycleError::bad_request("missing uuid").status(), 400);
        assert_eq!(
            LifecycleError::from(RecordStoreError::Duplicate(RecordId::new("r"))).status(),
            500
        );
        assert_eq!(LifecycleError::from(SearchIndexError::Timeout).status(), 502);
        assert_eq!(
            LifecycleError::from(TransitionError::ExhibitNotPublished).status(),
            400
        );
    }

    #[test]
    fn test_ack_failure_classes() {
        assert_eq!(LifecycleError::bad_request("missing id").ack_failure(), AckFailure::Invalid);
        assert_eq!(
            LifecycleError::from(TransitionError::ExhibitNotPublished).ack_failure(),
            AckFailure::Refused
        );
        assert_eq!(LifecycleError::from(TransitionError::Deleted).ack_failure(), AckFailure::NotFound);
        assert_eq!(
            LifecycleError::from(RecordStoreError::Database("down".into())).ack_failure(),
            AckFailure::Store
        );
        assert_eq!(LifecycleError::from(SearchIndexError::Timeout).ack_failure(), AckFailure::Index);
    }

    #[test]
    fn test_validation_issues_become_payload() {
        let response =
            LifecycleError::Validation(vec![ValidationIssue::new("text", "text is required")]).into_response();
        assert_eq!(response.status, 400);
        assert_eq!(response.data[0]["field"], "text");
        assert_eq!(response.data[0]["message"], "text is required");
    }

    #[test]
    fn test_invalid_styles_is_a_validation_error() {
        let err = LifecycleError::from(InvalidStyles);
        assert!(matches!(err, LifecycleError::Validation(ref issues) if issues[0].field == "styles"));
    }
}
