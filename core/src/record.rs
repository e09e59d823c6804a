//! Record kinds, identifiers, and the persisted record shape.
//!
//! Every content record in an exhibit (headings, items, grids, timelines and
//! the items nested inside grids and timelines) shares one lifecycle. The
//! differences between kinds are captured by a static [`KindDescriptor`]
//! rather than by separate types, so the coordinator is written once.

use crate::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Identifier of an exhibit (the root aggregate).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExhibitId(String);

impl ExhibitId {
    /// Wrap an exhibit identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExhibitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a content record. Generated once at creation and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap an existing record identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh UUID v4 identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a dashboard user (editor or administrator).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a user identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The content record variants managed by the lifecycle coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Section heading inside an exhibit
    Heading,
    /// Standalone exhibit item (text, image, media)
    Item,
    /// Grid container of items
    Grid,
    /// Timeline container of dated items
    Timeline,
    /// Item nested inside a grid
    GridItem,
    /// Item nested inside a timeline
    TimelineItem,
}

/// Static description of how a [`RecordKind`] is stored and addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDescriptor {
    /// Table holding records of this kind
    pub table: &'static str,
    /// Human-readable label used in messages
    pub label: &'static str,
    /// Kind of the owning container, for nested kinds
    pub container: Option<RecordKind>,
    /// Column referencing the owning container, for nested kinds
    pub container_column: Option<&'static str>,
    /// Kind nested inside this one, for containers
    pub child: Option<RecordKind>,
}

const HEADING: KindDescriptor = KindDescriptor {
    table: "exhibit_headings",
    label: "heading",
    container: None,
    container_column: None,
    child: None,
};

const ITEM: KindDescriptor = KindDescriptor {
    table: "exhibit_items",
    label: "item",
    container: None,
    container_column: None,
    child: None,
};

const GRID: KindDescriptor = KindDescriptor {
    table: "exhibit_grids",
    label: "grid",
    container: None,
    container_column: None,
    child: Some(RecordKind::GridItem),
};

const TIMELINE: KindDescriptor = KindDescriptor {
    table: "exhibit_timelines",
    label: "timeline",
    container: None,
    container_column: None,
    child: Some(RecordKind::TimelineItem),
};

const GRID_ITEM: KindDescriptor = KindDescriptor {
    table: "grid_items",
    label: "grid item",
    container: Some(RecordKind::Grid),
    container_column: Some("is_member_of_grid"),
    child: None,
};

const TIMELINE_ITEM: KindDescriptor = KindDescriptor {
    table: "timeline_items",
    label: "timeline item",
    container: Some(RecordKind::Timeline),
    container_column: Some("is_member_of_timeline"),
    child: None,
};

impl RecordKind {
    /// Every kind, containers before the kinds nested inside them.
    pub const ALL: [Self; 6] = [
        Self::Heading,
        Self::Item,
        Self::Grid,
        Self::Timeline,
        Self::GridItem,
        Self::TimelineItem,
    ];

    /// Storage and addressing descriptor for this kind.
    #[must_use]
    pub const fn descriptor(self) -> &'static KindDescriptor {
        match self {
            Self::Heading => &HEADING,
            Self::Item => &ITEM,
            Self::Grid => &GRID,
            Self::Timeline => &TIMELINE,
            Self::GridItem => &GRID_ITEM,
            Self::TimelineItem => &TIMELINE_ITEM,
        }
    }

    /// Human-readable label ("heading", "grid item", ...).
    #[must_use]
    pub const fn label(self) -> &'static str {
        self.descriptor().label
    }

    /// Table name in the record store.
    #[must_use]
    pub const fn table(self) -> &'static str {
        self.descriptor().table
    }

    /// Whether records of this kind live inside a grid or timeline.
    #[must_use]
    pub const fn is_nested(self) -> bool {
        self.descriptor().container.is_some()
    }

    /// Snake-case discriminator used by the recycle bin and in task keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Heading => "heading",
            Self::Item => "item",
            Self::Grid => "grid",
            Self::Timeline => "timeline",
            Self::GridItem => "grid_item",
            Self::TimelineItem => "timeline_item",
        }
    }

    /// Parse a top-level URL collection segment (`headings`, `items`, `grids`, `timelines`).
    #[must_use]
    pub fn from_collection(segment: &str) -> Option<Self> {
        match segment {
            "headings" => Some(Self::Heading),
            "items" => Some(Self::Item),
            "grids" => Some(Self::Grid),
            "timelines" => Some(Self::Timeline),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a record kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown record type: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for RecordKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// The sibling set a record belongs to.
///
/// Top-level kinds are scoped by exhibit only. Nested kinds are additionally
/// scoped by their owning grid or timeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    /// Owning exhibit
    pub exhibit_id: ExhibitId,
    /// Owning grid or timeline, for nested kinds
    pub container: Option<RecordId>,
}

impl Scope {
    /// Scope of a top-level record.
    #[must_use]
    pub const fn exhibit(exhibit_id: ExhibitId) -> Self {
        Self {
            exhibit_id,
            container: None,
        }
    }

    /// Scope of a record nested inside a grid or timeline.
    #[must_use]
    pub const fn nested(exhibit_id: ExhibitId, container: RecordId) -> Self {
        Self {
            exhibit_id,
            container: Some(container),
        }
    }

    /// Whether this scope has the right shape for `kind`.
    #[must_use]
    pub const fn fits(&self, kind: RecordKind) -> bool {
        kind.is_nested() == self.container.is_some()
    }
}

/// Opaque presentation styles attached to a record.
///
/// Always a JSON object. Absent, `null`, empty-string and empty-object payloads
/// all normalize to `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Styles(Map<String, Value>);

/// Error returned when a styles payload is not a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("styles must be a JSON object")]
pub struct InvalidStyles;

impl Styles {
    /// Normalize an optional client payload into styles.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidStyles`] if the payload is neither absent, empty, nor an object.
    /// A string payload is parsed as JSON first.
    pub fn normalize(value: Option<&Value>) -> Result<Self, InvalidStyles> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(map)) => Ok(Self(map.clone())),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(Self::default()),
            Some(Value::String(s)) => Self::parse(s),
            Some(_) => Err(InvalidStyles),
        }
    }

    /// Parse styles from their persisted JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidStyles`] if the text is not a JSON object.
    pub fn parse(text: &str) -> Result<Self, InvalidStyles> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(Value::Null) => Ok(Self::default()),
            _ => Err(InvalidStyles),
        }
    }

    /// Serialize to the persisted JSON text.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// Borrow the underlying object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Whether no style properties are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Styles {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A persisted content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Primary key
    pub uuid: RecordId,
    /// Kind of record (selects table and behavior)
    pub kind: RecordKind,
    /// Owning exhibit; never empty after creation
    pub is_member_of_exhibit: ExhibitId,
    /// Owning grid or timeline, for nested kinds
    pub container: Option<RecordId>,
    /// Position among siblings in the same scope
    pub order: i64,
    /// Whether the record is visible in the public index
    pub is_published: bool,
    /// Editor currently holding the edit lock
    pub locked_by_user: Option<UserId>,
    /// Soft-delete marker (record lives in the recycle bin)
    pub is_deleted: bool,
    /// The unpublished or deleted state was imposed by the container, not
    /// chosen for this record; publishing or restoring the container undoes it
    #[serde(default)]
    pub held_by_container: bool,
    /// Presentation styles
    pub styles: Styles,
    /// Kind-specific fields (text, title, media, dates, ...)
    pub content: Map<String, Value>,
    /// Creation time
    pub created: DateTime<Utc>,
    /// Creating user
    pub created_by: Option<UserId>,
    /// Last update time
    pub updated: Option<DateTime<Utc>>,
    /// Last updating user
    pub updated_by: Option<UserId>,
}

impl Record {
    /// Whether an editor currently holds the lock.
    ///
    /// Derived from `locked_by_user` so the lock flag and the holder can never disagree.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked_by_user.is_some()
    }

    /// The scope this record belongs to.
    #[must_use]
    pub fn scope(&self) -> Scope {
        Scope {
            exhibit_id: self.is_member_of_exhibit.clone(),
            container: self.container.clone(),
        }
    }

    /// Flat JSON view returned to API clients: content fields plus the system columns.
    ///
    /// System columns win over content fields of the same name.
    #[must_use]
    pub fn to_json(&self) -> Value {
        fn user(id: Option<&UserId>) -> Value {
            id.map_or(Value::Null, |u| Value::from(u.as_str()))
        }

        let mut map = self.content.clone();
        map.insert("uuid".into(), Value::from(self.uuid.as_str()));
        map.insert(
            "is_member_of_exhibit".into(),
            Value::from(self.is_member_of_exhibit.as_str()),
        );
        if let (Some(column), Some(container)) = (self.kind.descriptor().container_column, &self.container) {
            map.insert(column.into(), Value::from(container.as_str()));
        }
        map.insert("type".into(), Value::from(self.kind.as_str()));
        map.insert("order".into(), Value::from(self.order));
        map.insert("is_published".into(), Value::from(self.is_published));
        map.insert("is_locked".into(), Value::from(self.is_locked()));
        map.insert("locked_by_user".into(), user(self.locked_by_user.as_ref()));
        map.insert("is_deleted".into(), Value::from(self.is_deleted));
        map.insert("styles".into(), Value::Object(self.styles.as_map().clone()));
        map.insert("created".into(), Value::from(self.created.to_rfc3339()));
        map.insert("created_by".into(), user(self.created_by.as_ref()));
        map.insert(
            "updated".into(),
            self.updated.map_or(Value::Null, |at| Value::from(at.to_rfc3339())),
        );
        map.insert("updated_by".into(), user(self.updated_by.as_ref()));
        Value::Object(map)
    }
}

/// Publication state of an exhibit, as seen by the lifecycle coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExhibitSummary {
    /// Exhibit identifier
    pub uuid: ExhibitId,
    /// Whether the exhibit itself is published
    pub is_published: bool,
    /// Last update time
    pub updated: Option<DateTime<Utc>>,
    /// Last updating user
    pub updated_by: Option<UserId>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in RecordKind::ALL {
            assert_eq!(kind.as_str().parse::<RecordKind>().unwrap(), kind);
        }
        assert!("exhibit".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_nested_kinds_reference_their_container() {
        assert_eq!(RecordKind::GridItem.descriptor().container, Some(RecordKind::Grid));
        assert_eq!(RecordKind::Grid.descriptor().child, Some(RecordKind::GridItem));
        assert_eq!(
            RecordKind::TimelineItem.descriptor().container_column,
            Some("is_member_of_timeline")
        );
        assert!(!RecordKind::Heading.is_nested());
    }

    #[test]
    fn test_scope_shape() {
        let exhibit = ExhibitId::new("e1");
        assert!(Scope::exhibit(exhibit.clone()).fits(RecordKind::Heading));
        assert!(!Scope::exhibit(exhibit.clone()).fits(RecordKind::GridItem));
        assert!(Scope::nested(exhibit, RecordId::new("g1")).fits(RecordKind::GridItem));
    }

    #[test]
    fn test_styles_default_to_empty_object() {
        assert_eq!(Styles::normalize(None).unwrap().to_json_string(), "{}");
        assert_eq!(Styles::normalize(Some(&json!(""))).unwrap().to_json_string(), "{}");
        assert_eq!(Styles::normalize(Some(&json!({}))).unwrap().to_json_string(), "{}");
        assert_eq!(Styles::normalize(Some(&Value::Null)).unwrap(), Styles::default());
    }

    #[test]
    fn test_styles_accept_serialized_object() {
        let styles = Styles::normalize(Some(&json!("{\"color\":\"red\"}"))).unwrap();
        assert_eq!(styles.as_map().get("color"), Some(&json!("red")));
    }

    #[test]
    fn test_styles_reject_non_objects() {
        assert_eq!(Styles::normalize(Some(&json!([1, 2]))), Err(InvalidStyles));
        assert_eq!(Styles::normalize(Some(&json!(3))), Err(InvalidStyles));
        assert_eq!(Styles::parse("not json"), Err(InvalidStyles));
    }

    #[test]
    fn test_json_view_flattens_content_and_system_columns() {
        let mut content = Map::new();
        content.insert("text".into(), json!("Intro"));
        content.insert("uuid".into(), json!("spoofed"));
        let record = Record {
            uuid: RecordId::new("gi1"),
            kind: RecordKind::GridItem,
            is_member_of_exhibit: ExhibitId::new("e1"),
            container: Some(RecordId::new("g1")),
            order: 2,
            is_published: true,
            locked_by_user: Some(UserId::new("alice")),
            is_deleted: false,
            held_by_container: false,
            styles: Styles::default(),
            content,
            created: DateTime::<Utc>::UNIX_EPOCH,
            created_by: None,
            updated: None,
            updated_by: None,
        };

        let view = record.to_json();
        assert_eq!(view["uuid"], "gi1");
        assert_eq!(view["text"], "Intro");
        assert_eq!(view["is_member_of_grid"], "g1");
        assert_eq!(view["is_locked"], true);
        assert_eq!(view["locked_by_user"], "alice");
        assert_eq!(view["styles"], json!({}));
        assert_eq!(view["updated"], Value::Null);
    }

    fn arb_json_leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-z0-9 #]{0,12}".prop_map(Value::from),
        ]
    }

    proptest! {
        #[test]
        fn prop_styles_survive_persistence(
            entries in proptest::collection::btree_map("[a-z_]{1,8}", arb_json_leaf(), 0..8)
        ) {
            let map: Map<String, Value> = entries.into_iter().collect();
            let styles = Styles::from(map);
            let restored = Styles::parse(&styles.to_json_string()).unwrap();
            prop_assert_eq!(restored, styles);
        }
    }
}
