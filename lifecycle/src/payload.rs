//! Request payload shaping shared by create and update.

use exhibits_core::LifecycleError;
use serde_json::{Map, Value};

/// Keys the client may never set directly.
pub const RESERVED_KEYS: &[&str] = &[
    "uuid",
    "type",
    "is_member_of_exhibit",
    "is_member_of_grid",
    "is_member_of_timeline",
    "order",
    "is_published",
    "is_locked",
    "locked_by_user",
    "is_deleted",
    "created",
    "created_by",
    "updated",
    "updated_by",
];

/// A client payload split into persisted content, styles and control flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    /// Kind-specific fields to persist
    pub content: Map<String, Value>,
    /// Raw `styles` value, if the client sent one
    pub styles: Option<Value>,
    /// `is_published` was truthy: the record should be republished
    pub republish: bool,
}

impl Payload {
    /// Split a request body.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` when the body is not a JSON object or is empty.
    pub fn from_body(body: Value) -> Result<Self, LifecycleError> {
        let Value::Object(mut fields) = body else {
            return Err(LifecycleError::bad_request("Request body must be a JSON object"));
        };
        if fields.is_empty() {
            return Err(LifecycleError::bad_request("Missing record data"));
        }

        let republish = fields.get("is_published").is_some_and(is_truthy);
        let styles = fields.remove("styles");
        for key in RESERVED_KEYS {
            fields.remove(*key);
        }

        Ok(Self {
            content: fields,
            styles,
            republish,
        })
    }
}

/// Loose truthiness used for flags coming from form posts.
///
/// `true`, non-zero numbers and the strings `true` / `1` / `yes` / `on` are truthy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on"),
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reserved_keys_are_stripped() {
        let payload = Payload::from_body(json!({
            "text": "Intro",
            "uuid": "spoofed",
            "order": 99,
            "is_locked": 1,
            "created_by": "mallory",
            "styles": {"color": "red"}
        }))
        .unwrap();

        assert_eq!(payload.content, json!({"text": "Intro"}).as_object().cloned().unwrap());
        assert_eq!(payload.styles, Some(json!({"color": "red"})));
        assert!(!payload.republish);
    }

    #[test]
    fn test_republish_flag_is_read_then_stripped() {
        let payload = Payload::from_body(json!({"title": "T", "is_published": "true"})).unwrap();
        assert!(payload.republish);
        assert!(!payload.content.contains_key("is_published"));
    }

    #[test]
    fn test_shape_checks() {
        assert!(matches!(
            Payload::from_body(json!([1, 2])),
            Err(LifecycleError::BadRequest(_))
        ));
        assert!(matches!(
            Payload::from_body(json!({})),
            Err(LifecycleError::BadRequest(_))
        ));
    }

    #[test]
    fn test_truthiness() {
        for value in [json!(true), json!(1), json!("1"), json!("TRUE"), json!(" yes ")] {
            assert!(is_truthy(&value), "{value} should be truthy");
        }
        for value in [json!(false), json!(0), json!("0"), json!("false"), json!(null), json!({})] {
            assert!(!is_truthy(&value), "{value} should be falsy");
        }
    }
}
