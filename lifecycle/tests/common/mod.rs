//! Shared harness for lifecycle integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use exhibits_core::environment::AdminList;
use exhibits_core::record::{ExhibitId, Record, RecordId, RecordKind, Scope};
use exhibits_lifecycle::{LifecycleConfig, LifecycleCoordinator, LifecycleEnvironment};
use exhibits_testing::{test_clock, InMemoryRecordStore, ManualScheduler, RecordBuilder, RecordingSearchIndex};
use std::sync::Arc;
use std::time::Duration;

pub const REPUBLISH_DELAY: Duration = Duration::from_millis(5000);

/// Coordinator wired to in-memory collaborators the test can inspect.
pub struct Harness {
    pub store: InMemoryRecordStore,
    pub index: RecordingSearchIndex,
    pub scheduler: ManualScheduler,
    pub coordinator: LifecycleCoordinator,
    pub exhibit: ExhibitId,
}

impl Harness {
    /// Exhibit `e1`, published or not, with `root` as the only administrator.
    pub fn new(exhibit_published: bool) -> Self {
        exhibits_testing::init_test_tracing();

        let store = InMemoryRecordStore::new();
        let index = RecordingSearchIndex::new();
        let scheduler = ManualScheduler::new();
        let exhibit = ExhibitId::new("e1");
        store.add_exhibit(exhibit.clone(), exhibit_published);

        let env = LifecycleEnvironment::new(
            Arc::new(store.clone()),
            Arc::new(index.clone()),
            Arc::new(scheduler.clone()),
        )
        .with_clock(Arc::new(test_clock()))
        .with_authorizer(Arc::new(AdminList::parse("root")));
        let coordinator = LifecycleCoordinator::new(
            env,
            LifecycleConfig::default().with_republish_delay(REPUBLISH_DELAY),
        );

        Self {
            store,
            index,
            scheduler,
            coordinator,
            exhibit,
        }
    }

    pub fn scope(&self) -> Scope {
        Scope::exhibit(self.exhibit.clone())
    }

    pub fn nested(&self, container: &str) -> Scope {
        Scope::nested(self.exhibit.clone(), RecordId::new(container))
    }

    /// Seed a record built from `kind` in the harness exhibit.
    pub fn seed(&self, kind: RecordKind, uuid: &str, configure: impl FnOnce(RecordBuilder) -> RecordBuilder) -> RecordId {
        let record = configure(RecordBuilder::new(kind, self.exhibit.clone()).uuid(uuid)).build();
        let id = record.uuid.clone();
        self.store.seed(record);
        id
    }

    /// Seed a published record that is also present in the index.
    pub fn seed_published(&self, kind: RecordKind, uuid: &str, configure: impl FnOnce(RecordBuilder) -> RecordBuilder) -> RecordId {
        let id = self.seed(kind, uuid, |b| configure(b).published(true));
        self.index.seed(kind, self.exhibit.clone(), id.clone());
        id
    }

    pub fn record(&self, kind: RecordKind, id: &RecordId) -> Record {
        self.store.record(kind, id).expect("record should exist")
    }
}

/// Let spawned fire-and-forget tasks run.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
