//! Custom Axum extractors.
//!
//! - [`ActingUser`]: the user the upstream authentication layer vouches for
//! - [`RecordCollection`]: the sibling set a collection route addresses
//! - [`RecordMember`]: the single record a member route addresses
//!
//! Collection and member routes exist in a top-level and a nested form:
//!
//! ```text
//! /exhibits/:exhibit_id/:kind                        top-level collection
//! /exhibits/:exhibit_id/:kind/:id                    top-level record
//! /exhibits/:exhibit_id/:kind/:id/items              items of a grid or timeline
//! /exhibits/:exhibit_id/:kind/:id/items/:item_id     one item of a grid or timeline
//! ```
//!
//! The same handlers serve both forms; the extractors tell them apart by the
//! path parameters present.

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use exhibits_core::record::{ExhibitId, RecordId, RecordKind, Scope, UserId};
use std::collections::HashMap;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The acting user, if the request carries one.
///
/// Reads the `X-User-Id` header. Token verification happens upstream; this
/// service trusts the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser(pub Option<UserId>);

#[async_trait]
impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(UserId::new);

        Ok(Self(user))
    }
}

/// Sibling set addressed by a collection route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCollection {
    /// Kind of the records in the set
    pub kind: RecordKind,
    /// Exhibit, plus container for nested kinds
    pub scope: Scope,
}

/// Single record addressed by a member route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMember {
    /// Kind of the record
    pub kind: RecordKind,
    /// Exhibit, plus container for nested kinds
    pub scope: Scope,
    /// The record itself
    pub id: RecordId,
}

#[async_trait]
impl<S> FromRequestParts<S> for RecordCollection
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state).await?;
        let (kind, scope) = match params.get("id") {
            Some(container) => nested(&params, container)?,
            None => top_level(&params)?,
        };
        Ok(Self { kind, scope })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RecordMember
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state).await?;
        let (kind, scope, id) = match (params.get("item_id"), params.get("id")) {
            (Some(item), Some(container)) => {
                let (kind, scope) = nested(&params, container)?;
                (kind, scope, item)
            }
            (None, Some(id)) => {
                let (kind, scope) = top_level(&params)?;
                (kind, scope, id)
            }
            _ => return Err(AppError::bad_request("Missing record id")),
        };
        Ok(Self {
            kind,
            scope,
            id: RecordId::new(id.as_str()),
        })
    }
}

fn exhibit(params: &HashMap<String, String>) -> Result<ExhibitId, AppError> {
    params
        .get("exhibit_id")
        .map(|id| ExhibitId::new(id.as_str()))
        .ok_or_else(|| AppError::bad_request("Missing exhibit id"))
}

fn collection(params: &HashMap<String, String>) -> Result<RecordKind, AppError> {
    let segment = params
        .get("kind")
        .ok_or_else(|| AppError::bad_request("Missing record type"))?;
    RecordKind::from_collection(segment)
        .ok_or_else(|| AppError::bad_request(format!("Unknown record type: {segment}")))
}

fn top_level(params: &HashMap<String, String>) -> Result<(RecordKind, Scope), AppError> {
    Ok((collection(params)?, Scope::exhibit(exhibit(params)?)))
}

fn nested(params: &HashMap<String, String>, container: &str) -> Result<(RecordKind, Scope), AppError> {
    let container_kind = collection(params)?;
    let kind = container_kind
        .descriptor()
        .child
        .ok_or_else(|| AppError::bad_request(format!("A {} has no items", container_kind.label())))?;
    Ok((kind, Scope::nested(exhibit(params)?, RecordId::new(container))))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn test_top_level_collection() {
        let (kind, scope) = top_level(&params(&[("exhibit_id", "e1"), ("kind", "headings")])).unwrap();
        assert_eq!(kind, RecordKind::Heading);
        assert_eq!(scope, Scope::exhibit(ExhibitId::new("e1")));
    }

    #[test]
    fn test_nested_collection_resolves_child_kind() {
        let p = params(&[("exhibit_id", "e1"), ("kind", "timelines"), ("id", "t1")]);
        let (kind, scope) = nested(&p, "t1").unwrap();
        assert_eq!(kind, RecordKind::TimelineItem);
        assert_eq!(scope.container, Some(RecordId::new("t1")));
    }

    #[test]
    fn test_only_containers_have_items() {
        let p = params(&[("exhibit_id", "e1"), ("kind", "headings"), ("id", "h1")]);
        let err = nested(&p, "h1").unwrap_err();
        assert_eq!(err.to_string(), "[BAD_REQUEST] A heading has no items");
    }

    #[test]
    fn test_unknown_collection_is_bad_request() {
        let err = top_level(&params(&[("exhibit_id", "e1"), ("kind", "banners")])).unwrap_err();
        assert_eq!(err.to_string(), "[BAD_REQUEST] Unknown record type: banners");
    }
}
