//! # Exhibits Testing
//!
//! Testing utilities and helpers for the exhibits lifecycle service.
//!
//! This crate provides:
//! - In-memory implementations of the collaborator traits, with failure injection
//! - A manually driven scheduler for deferred republication
//! - Record builders and property-based testing strategies
//!
//! ## Example
//!
//! ```
//! use exhibits_core::record::{ExhibitId, RecordKind};
//! use exhibits_core::search_index::SearchIndex;
//! use exhibits_testing::{InMemoryRecordStore, RecordingSearchIndex, RecordBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryRecordStore::new();
//! let index = RecordingSearchIndex::new();
//!
//! let exhibit = ExhibitId::new("e1");
//! store.add_exhibit(exhibit.clone(), true);
//! let heading = RecordBuilder::new(RecordKind::Heading, exhibit.clone()).build();
//! index.index_record(RecordKind::Heading, exhibit, heading.uuid.clone()).await?;
//! assert!(index.is_indexed(&heading.uuid));
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use exhibits_core::environment::Clock;

mod record_store;
mod scheduler;
mod search_index;

pub use record_store::{InMemoryRecordStore, StoreOperation};
pub use scheduler::ManualScheduler;
pub use search_index::{IndexCall, RecordingSearchIndex};

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use exhibits_core::record::RecordKind;
    use exhibits_core::validation::{ValidationIssue, ValidationMode, Validator};
    use serde_json::{Map, Value};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use exhibits_testing::mocks::FixedClock;
    /// use exhibits_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }

    /// Validator with a canned answer, regardless of payload.
    #[derive(Debug, Clone, Default)]
    pub struct StaticValidator {
        issues: Vec<ValidationIssue>,
    }

    impl StaticValidator {
        /// Accept every payload.
        #[must_use]
        pub const fn accepting() -> Self {
            Self { issues: Vec::new() }
        }

        /// Reject every payload with `issues`.
        #[must_use]
        pub const fn rejecting(issues: Vec<ValidationIssue>) -> Self {
            Self { issues }
        }
    }

    impl Validator for StaticValidator {
        fn validate(
            &self,
            _kind: RecordKind,
            _mode: ValidationMode,
            _data: &Map<String, Value>,
        ) -> Result<(), Vec<ValidationIssue>> {
            if self.issues.is_empty() {
                Ok(())
            } else {
                Err(self.issues.clone())
            }
        }
    }
}

/// Test data builders.
pub mod fixtures {
    use exhibits_core::record::{ExhibitId, Record, RecordId, RecordKind, Styles, UserId};
    use exhibits_core::environment::Clock;
    use serde_json::{Map, Value};

    /// Builder for seeded [`Record`]s.
    ///
    /// Defaults to an active, unpublished, unlocked record at order 0 with a
    /// fresh uuid, created at [`crate::test_clock`] time.
    #[derive(Debug, Clone)]
    pub struct RecordBuilder {
        record: Record,
    }

    impl RecordBuilder {
        /// Start a record of `kind` in `exhibit_id`.
        #[must_use]
        pub fn new(kind: RecordKind, exhibit_id: ExhibitId) -> Self {
            Self {
                record: Record {
                    uuid: RecordId::generate(),
                    kind,
                    is_member_of_exhibit: exhibit_id,
                    container: None,
                    order: 0,
                    is_published: false,
                    locked_by_user: None,
                    is_deleted: false,
                    held_by_container: false,
                    styles: Styles::default(),
                    content: Map::new(),
                    created: crate::test_clock().now(),
                    created_by: None,
                    updated: None,
                    updated_by: None,
                },
            }
        }

        /// Use a specific uuid.
        #[must_use]
        pub fn uuid(mut self, uuid: impl Into<String>) -> Self {
            self.record.uuid = RecordId::new(uuid);
            self
        }

        /// Nest inside a grid or timeline.
        #[must_use]
        pub fn container(mut self, container: RecordId) -> Self {
            self.record.container = Some(container);
            self
        }

        /// Sibling position.
        #[must_use]
        pub const fn order(mut self, order: i64) -> Self {
            self.record.order = order;
            self
        }

        /// Publication flag.
        #[must_use]
        pub const fn published(mut self, published: bool) -> Self {
            self.record.is_published = published;
            self
        }

        /// Soft-delete flag.
        #[must_use]
        pub const fn deleted(mut self, deleted: bool) -> Self {
            self.record.is_deleted = deleted;
            self
        }

        /// Mark the record's state as imposed by its container.
        #[must_use]
        pub const fn held_by_container(mut self, held: bool) -> Self {
            self.record.held_by_container = held;
            self
        }

        /// Lock holder.
        #[must_use]
        pub fn locked_by(mut self, user: &str) -> Self {
            self.record.locked_by_user = Some(UserId::new(user));
            self
        }

        /// Set one content field.
        #[must_use]
        pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
            self.record.content.insert(name.to_string(), value.into());
            self
        }

        /// Finish.
        #[must_use]
        pub fn build(self) -> Record {
            self.record
        }
    }
}

/// Property-based testing utilities.
pub mod properties {
    use exhibits_core::record::RecordKind;
    use proptest::prelude::*;
    use serde_json::{Map, Value};

    /// Any record kind.
    pub fn arb_kind() -> impl Strategy<Value = RecordKind> {
        proptest::sample::select(RecordKind::ALL.to_vec())
    }

    /// Any top-level (non-nested) record kind.
    pub fn arb_top_level_kind() -> impl Strategy<Value = RecordKind> {
        proptest::sample::select(vec![
            RecordKind::Heading,
            RecordKind::Item,
            RecordKind::Grid,
            RecordKind::Timeline,
        ])
    }

    /// Small flat JSON object of scalar values.
    pub fn arb_object() -> impl Strategy<Value = Map<String, Value>> {
        let leaf = prop_oneof![
            any::<bool>().prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            "[a-zA-Z0-9 ]{0,16}".prop_map(Value::from),
        ];
        proptest::collection::btree_map("[a-z_]{1,10}", leaf, 0..6).prop_map(|m| m.into_iter().collect())
    }
}

/// Install a `tracing` subscriber writing to the test output.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use fixtures::RecordBuilder;
pub use mocks::{FixedClock, StaticValidator, test_clock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_record_builder_defaults() {
        let record = RecordBuilder::new(
            exhibits_core::record::RecordKind::Heading,
            exhibits_core::record::ExhibitId::new("e1"),
        )
        .build();
        assert!(!record.is_published);
        assert!(!record.is_locked());
        assert!(record.styles.is_empty());
    }
}
