//! Injected dependencies and tunables of the lifecycle coordinator.

use exhibits_core::environment::{AdminList, Authorizer, Clock, SystemClock};
use exhibits_core::record_store::RecordStore;
use exhibits_core::schedule::TaskScheduler;
use exhibits_core::search_index::SearchIndex;
use exhibits_core::validation::{SchemaValidator, Validator};
use std::sync::Arc;
use std::time::Duration;

/// Default delay between the suppress and the republish of an edited record.
pub const DEFAULT_REPUBLISH_DELAY: Duration = Duration::from_millis(5000);

/// Every collaborator the coordinator talks to.
///
/// Production wires `PostgresRecordStore`, the HTTP search index client and a
/// `DelayedTaskQueue`; tests wire the in-memory doubles from `exhibits-testing`.
#[derive(Clone)]
pub struct LifecycleEnvironment {
    /// Source of truth for records
    pub store: Arc<dyn RecordStore>,
    /// Public search index
    pub index: Arc<dyn SearchIndex>,
    /// Payload schema validation
    pub validator: Arc<dyn Validator>,
    /// Time source for audit stamps
    pub clock: Arc<dyn Clock>,
    /// Administrator check for unlock
    pub authorizer: Arc<dyn Authorizer>,
    /// Deferred republication
    pub scheduler: Arc<dyn TaskScheduler>,
}

impl LifecycleEnvironment {
    /// Environment with the default validator, system clock and no administrators.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        index: Arc<dyn SearchIndex>,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> Self {
        Self {
            store,
            index,
            validator: Arc::new(SchemaValidator::new()),
            clock: Arc::new(SystemClock),
            authorizer: Arc::new(AdminList::default()),
            scheduler,
        }
    }

    /// Replace the validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the authorizer.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }
}

/// Coordinator tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Delay before an edited record is published again
    pub republish_delay: Duration,
}

impl LifecycleConfig {
    /// Set the republish delay.
    #[must_use]
    pub const fn with_republish_delay(mut self, delay: Duration) -> Self {
        self.republish_delay = delay;
        self
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            republish_delay: DEFAULT_REPUBLISH_DELAY,
        }
    }
}
