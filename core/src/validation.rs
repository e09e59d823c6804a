//! Payload validation.
//!
//! The coordinator treats validation as an opaque `validate(data)` call whose
//! issue list is returned to the caller unmodified. [`SchemaValidator`] is the
//! default implementation: a small declarative rule table per record kind.

use crate::record::RecordKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Whether a payload is being validated for creation or for update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Required fields must be present
    Create,
    /// Every field is optional, present fields must still be valid
    Update,
}

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Offending field
    pub field: String,
    /// Human-readable reason
    pub message: String,
}

impl ValidationIssue {
    /// Create an issue for `field`.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Schema validation for record payloads.
pub trait Validator: Send + Sync {
    /// Validate `data` for `kind`.
    ///
    /// # Errors
    ///
    /// Returns every issue found; an empty list is never returned as an error.
    fn validate(
        &self,
        kind: RecordKind,
        mode: ValidationMode,
        data: &Map<String, Value>,
    ) -> Result<(), Vec<ValidationIssue>>;
}

/// JSON type expected for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// JSON string
    String,
    /// JSON integer
    Integer,
    /// JSON boolean
    Boolean,
}

/// Declarative rule for one payload field.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// Field name
    pub name: &'static str,
    /// Expected JSON type
    pub ty: FieldType,
    /// Must be present on create
    pub required: bool,
    /// Maximum string length in characters
    pub max_len: Option<usize>,
    /// Allowed string values (empty = any)
    pub allowed: &'static [&'static str],
    /// Inclusive integer range
    pub range: Option<(i64, i64)>,
}

impl FieldRule {
    const fn string(name: &'static str, required: bool, max_len: usize) -> Self {
        Self {
            name,
            ty: FieldType::String,
            required,
            max_len: Some(max_len),
            allowed: &[],
            range: None,
        }
    }

    const fn one_of(name: &'static str, required: bool, allowed: &'static [&'static str]) -> Self {
        Self {
            name,
            ty: FieldType::String,
            required,
            max_len: None,
            allowed,
            range: None,
        }
    }

    const fn integer(name: &'static str, required: bool, min: i64, max: i64) -> Self {
        Self {
            name,
            ty: FieldType::Integer,
            required,
            max_len: None,
            allowed: &[],
            range: Some((min, max)),
        }
    }

    const fn boolean(name: &'static str) -> Self {
        Self {
            name,
            ty: FieldType::Boolean,
            required: false,
            max_len: None,
            allowed: &[],
            range: None,
        }
    }

    fn check(&self, value: &Value, issues: &mut Vec<ValidationIssue>) {
        match (self.ty, value) {
            (FieldType::String, Value::String(s)) => {
                if self.required && s.trim().is_empty() {
                    issues.push(ValidationIssue::new(self.name, format!("{} cannot be empty", self.name)));
                }
                if let Some(max) = self.max_len {
                    if s.chars().count() > max {
                        issues.push(ValidationIssue::new(
                            self.name,
                            format!("{} must be at most {max} characters", self.name),
                        ));
                    }
                }
                if !self.allowed.is_empty() && !self.allowed.contains(&s.as_str()) {
                    issues.push(ValidationIssue::new(
                        self.name,
                        format!("{} must be one of: {}", self.name, self.allowed.join(", ")),
                    ));
                }
            }
            (FieldType::Integer, Value::Number(n)) if n.is_i64() => {
                if let (Some((min, max)), Some(v)) = (self.range, n.as_i64()) {
                    if v < min || v > max {
                        issues.push(ValidationIssue::new(
                            self.name,
                            format!("{} must be between {min} and {max}", self.name),
                        ));
                    }
                }
            }
            (FieldType::Boolean, Value::Bool(_)) => {}
            (_, Value::Null) if !self.required => {}
            (ty, _) => issues.push(ValidationIssue::new(
                self.name,
                format!("{} must be a {}", self.name, type_name(ty)),
            )),
        }
    }
}

const fn type_name(ty: FieldType) -> &'static str {
    match ty {
        FieldType::String => "string",
        FieldType::Integer => "integer",
        FieldType::Boolean => "boolean",
    }
}

const ITEM_TYPES: &[&str] = &["text", "image", "video", "audio", "pdf"];
const LAYOUTS: &[&str] = &["media_left", "media_right", "media_top", "media_bottom", "text_only"];

const HEADING_RULES: &[FieldRule] = &[
    FieldRule::string("text", true, 1000),
    FieldRule::boolean("is_visible"),
];

const ITEM_RULES: &[FieldRule] = &[
    FieldRule::one_of("item_type", true, ITEM_TYPES),
    FieldRule::string("title", false, 500),
    FieldRule::string("caption", false, 2000),
    FieldRule::string("description", false, 5000),
    FieldRule::string("text", false, 100_000),
    FieldRule::string("media", false, 2048),
    FieldRule::string("kaltura", false, 255),
    FieldRule::string("repo_uuid", false, 255),
    FieldRule::one_of("layout", false, LAYOUTS),
    FieldRule::integer("media_width", false, 10, 100),
    FieldRule::boolean("wrap_text"),
];

const GRID_RULES: &[FieldRule] = &[
    FieldRule::string("title", false, 500),
    FieldRule::string("text", false, 100_000),
    FieldRule::integer("columns", false, 1, 12),
];

const TIMELINE_RULES: &[FieldRule] = &[
    FieldRule::string("title", true, 500),
    FieldRule::string("text", false, 100_000),
];

const TIMELINE_ITEM_RULES: &[FieldRule] = &[
    FieldRule::one_of("item_type", true, ITEM_TYPES),
    FieldRule::string("date", true, 50),
    FieldRule::string("title", false, 500),
    FieldRule::string("caption", false, 2000),
    FieldRule::string("description", false, 5000),
    FieldRule::string("text", false, 100_000),
    FieldRule::string("media", false, 2048),
    FieldRule::one_of("layout", false, LAYOUTS),
];

/// Rule-table validator covering every record kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    /// Create the default validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Field rules applied to `kind`.
    #[must_use]
    pub const fn rules(kind: RecordKind) -> &'static [FieldRule] {
        match kind {
            RecordKind::Heading => HEADING_RULES,
            RecordKind::Item | RecordKind::GridItem => ITEM_RULES,
            RecordKind::Grid => GRID_RULES,
            RecordKind::Timeline => TIMELINE_RULES,
            RecordKind::TimelineItem => TIMELINE_ITEM_RULES,
        }
    }
}

impl Validator for SchemaValidator {
    fn validate(
        &self,
        kind: RecordKind,
        mode: ValidationMode,
        data: &Map<String, Value>,
    ) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        for rule in Self::rules(kind) {
            match data.get(rule.name) {
                Some(value) => rule.check(value, &mut issues),
                None if rule.required && mode == ValidationMode::Create => {
                    issues.push(ValidationIssue::new(rule.name, format!("{} is required", rule.name)));
                }
                None => {}
            }
        }

        if issues.is_empty() { Ok(()) } else { Err(issues) }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_heading_requires_text_on_create() {
        let validator = SchemaValidator::new();
        let issues = validator
            .validate(RecordKind::Heading, ValidationMode::Create, &Map::new())
            .unwrap_err();
        assert_eq!(issues, vec![ValidationIssue::new("text", "text is required")]);

        assert!(
            validator
                .validate(RecordKind::Heading, ValidationMode::Create, &payload(json!({"text": "Intro"})))
                .is_ok()
        );
    }

    #[test]
    fn test_update_mode_skips_missing_required_fields() {
        let validator = SchemaValidator::new();
        assert!(
            validator
                .validate(RecordKind::Timeline, ValidationMode::Update, &Map::new())
                .is_ok()
        );
    }

    #[test]
    fn test_update_mode_still_checks_present_fields() {
        let validator = SchemaValidator::new();
        let issues = validator
            .validate(RecordKind::Item, ValidationMode::Update, &payload(json!({"item_type": "hologram"})))
            .unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "item_type");
    }

    #[test]
    fn test_type_and_range_errors_are_collected() {
        let validator = SchemaValidator::new();
        let issues = validator
            .validate(
                RecordKind::Grid,
                ValidationMode::Create,
                &payload(json!({"title": 7, "columns": 40})),
            )
            .unwrap_err();
        let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "columns"]);
    }

    #[test]
    fn test_optional_null_is_accepted() {
        let validator = SchemaValidator::new();
        assert!(
            validator
                .validate(
                    RecordKind::Item,
                    ValidationMode::Create,
                    &payload(json!({"item_type": "text", "caption": null})),
                )
                .is_ok()
        );
    }
}
