//! Integration tests for the lifecycle coordinator.
//!
//! Covers creation and ordering, pure reads versus edit reads, updates,
//! soft deletion, and the publish / suppress ordering against the index.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{settle, Harness};
use exhibits_core::record::{RecordId, RecordKind, UserId};
use exhibits_core::response::AckFailure;
use exhibits_core::schedule::{TaskError, TaskKey};
use exhibits_lifecycle::{ReorderItem, UnlockOptions};
use exhibits_testing::{test_clock, IndexCall, StoreOperation};
use exhibits_core::environment::Clock;
use proptest::prelude::*;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_first_heading_starts_at_order_zero_with_empty_styles() {
    let h = Harness::new(false);

    let response = h
        .coordinator
        .create(RecordKind::Heading, &h.scope(), json!({"text": "Intro"}), Some(UserId::new("alice")))
        .await;

    assert_eq!(response.status, 201);
    let id = RecordId::new(response.data.as_str().expect("uuid in data"));
    let stored = h.record(RecordKind::Heading, &id);
    assert_eq!(stored.order, 0);
    assert_eq!(stored.styles.to_json_string(), "{}");
    assert_eq!(stored.content.get("text"), Some(&json!("Intro")));
    assert!(!stored.is_published);
    assert!(!stored.is_locked());
    assert_eq!(stored.created_by, Some(UserId::new("alice")));

    // The exhibit touch runs in the background
    settle().await;
    let exhibit = h.store.exhibit_summary(&h.exhibit).unwrap();
    assert_eq!(exhibit.updated, Some(test_clock().now()));
    assert_eq!(exhibit.updated_by, Some(UserId::new("alice")));
}

#[tokio::test]
async fn test_create_ignores_client_supplied_system_fields() {
    let h = Harness::new(true);

    let response = h
        .coordinator
        .create(
            RecordKind::Heading,
            &h.scope(),
            json!({"text": "Intro", "uuid": "spoofed", "order": 42, "is_published": true, "locked_by_user": "mallory"}),
            None,
        )
        .await;

    assert_eq!(response.status, 201);
    assert_ne!(response.data, json!("spoofed"));
    let stored = h.record(RecordKind::Heading, &RecordId::new(response.data.as_str().unwrap()));
    assert_eq!(stored.order, 0);
    assert!(!stored.is_published);
    assert!(stored.locked_by_user.is_none());
    assert!(!stored.content.contains_key("uuid"));
}

#[tokio::test]
async fn test_create_returns_validation_issues_unmodified() {
    let h = Harness::new(false);

    let response = h
        .coordinator
        .create(RecordKind::Heading, &h.scope(), json!({"is_visible": "yes"}), None)
        .await;

    assert_eq!(response.status, 400);
    let fields: Vec<&str> = response
        .data
        .as_array()
        .unwrap()
        .iter()
        .map(|issue| issue["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"text"));
    assert!(fields.contains(&"is_visible"));
    assert!(h.store.rows(RecordKind::Heading).is_empty());
}

#[tokio::test]
async fn test_create_rejects_malformed_requests() {
    let h = Harness::new(false);

    let empty = h.coordinator.create(RecordKind::Heading, &h.scope(), json!({}), None).await;
    assert_eq!(empty.status, 400);

    let not_object = h.coordinator.create(RecordKind::Heading, &h.scope(), json!("text"), None).await;
    assert_eq!(not_object.status, 400);

    let bad_styles = h
        .coordinator
        .create(RecordKind::Heading, &h.scope(), json!({"text": "x", "styles": [1]}), None)
        .await;
    assert_eq!(bad_styles.status, 400);
    assert_eq!(bad_styles.data[0]["field"], "styles");

    // Nested kinds need a container, top-level kinds must not have one
    let unscoped = h
        .coordinator
        .create(RecordKind::GridItem, &h.scope(), json!({"item_type": "text"}), None)
        .await;
    assert_eq!(unscoped.status, 400);
}

#[tokio::test]
async fn test_create_store_failure_is_distinct_from_validation_failure() {
    let h = Harness::new(false);
    h.store.set_failing(StoreOperation::Insert, true);

    let response = h
        .coordinator
        .create(RecordKind::Heading, &h.scope(), json!({"text": "Intro"}), None)
        .await;

    assert_eq!(response.status, 500);
    assert_eq!(response.data, Value::Null);
}

#[tokio::test]
async fn test_create_nested_item_requires_active_container() {
    let h = Harness::new(false);

    let orphan = h
        .coordinator
        .create(RecordKind::GridItem, &h.nested("g1"), json!({"item_type": "text"}), None)
        .await;
    assert_eq!(orphan.status, 400);
    assert_eq!(orphan.message, "Grid not found");

    h.seed(RecordKind::Grid, "g1", |b| b);
    h.seed(RecordKind::GridItem, "other", |b| b.container(RecordId::new("g2")).order(7));

    let first = h
        .coordinator
        .create(RecordKind::GridItem, &h.nested("g1"), json!({"item_type": "text"}), None)
        .await;
    assert_eq!(first.status, 201);
    let stored = h.record(RecordKind::GridItem, &RecordId::new(first.data.as_str().unwrap()));
    assert_eq!(stored.container, Some(RecordId::new("g1")));
    // Ordering is per container
    assert_eq!(stored.order, 0);
    assert_eq!(stored.to_json()["is_member_of_grid"], "g1");
    // Waits for the unpublished grid
    assert!(stored.held_by_container);
}

#[tokio::test]
async fn test_create_orders_after_deleted_siblings() {
    let h = Harness::new(false);
    h.seed(RecordKind::Item, "old", |b| b.order(3).deleted(true));

    let response = h
        .coordinator
        .create(RecordKind::Item, &h.scope(), json!({"item_type": "image"}), None)
        .await;

    let stored = h.record(RecordKind::Item, &RecordId::new(response.data.as_str().unwrap()));
    assert_eq!(stored.order, 4);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_sequential_creates_yield_orders_zero_to_n(n in 1usize..8) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let orders = runtime.block_on(async {
            let h = Harness::new(false);
            let mut orders = Vec::new();
            for i in 0..n {
                let response = h
                    .coordinator
                    .create(RecordKind::Heading, &h.scope(), json!({"text": format!("Heading {i}")}), None)
                    .await;
                let id = RecordId::new(response.data.as_str().unwrap());
                orders.push(h.record(RecordKind::Heading, &id).order);
            }
            orders
        });

        let expected: Vec<i64> = (0..n as i64).collect();
        prop_assert_eq!(orders, expected);
    }
}

// ---------------------------------------------------------------------------
// get / open_for_edit / list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_is_pure_and_missing_records_are_empty_success() {
    let h = Harness::new(false);
    let id = h.seed(RecordKind::Heading, "h1", |b| b.field("text", "Intro"));

    let response = h.coordinator.get(RecordKind::Heading, &h.scope(), &id).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.data["text"], "Intro");
    assert!(!h.record(RecordKind::Heading, &id).is_locked());

    let missing = h
        .coordinator
        .get(RecordKind::Heading, &h.scope(), &RecordId::new("nope"))
        .await;
    assert_eq!(missing.status, 200);
    assert_eq!(missing.data, Value::Null);
}

#[tokio::test]
async fn test_get_hides_deleted_records_and_reports_lookup_errors() {
    let h = Harness::new(false);
    let id = h.seed(RecordKind::Heading, "h1", |b| b.deleted(true));

    let response = h.coordinator.get(RecordKind::Heading, &h.scope(), &id).await;
    assert_eq!(response.data, Value::Null);

    h.store.set_failing(StoreOperation::Select, true);
    let failed = h.coordinator.get(RecordKind::Heading, &h.scope(), &id).await;
    assert_eq!(failed.status, 400);
}

#[tokio::test]
async fn test_concurrent_edit_reads_leave_exactly_one_lock_holder() {
    let h = Harness::new(false);
    let id = h.seed(RecordKind::Heading, "h1", |b| b);
    let scope = h.scope();
    let u1 = UserId::new("u1");
    let u2 = UserId::new("u2");

    let (first, second) = tokio::join!(
        h.coordinator.open_for_edit(RecordKind::Heading, &scope, &id, &u1),
        h.coordinator.open_for_edit(RecordKind::Heading, &scope, &id, &u2),
    );

    // Both reads succeed
    assert_eq!(first.status, 200);
    assert_eq!(second.status, 200);

    let statuses = [
        first.data["lock"]["status"].as_str().unwrap(),
        second.data["lock"]["status"].as_str().unwrap(),
    ];
    assert_eq!(statuses.iter().filter(|s| **s == "acquired").count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == "conflict").count(), 1);

    let holder = h.record(RecordKind::Heading, &id).locked_by_user.unwrap();
    assert!(holder == u1 || holder == u2);
    let loser = if statuses[0] == "conflict" { &first } else { &second };
    assert_eq!(loser.data["lock"]["holder"], holder.as_str());
    assert_eq!(loser.data["record"]["locked_by_user"], holder.as_str());
}

#[tokio::test]
async fn test_lock_is_exclusive_until_owner_or_admin_unlocks() {
    let h = Harness::new(false);
    let id = h.seed(RecordKind::Item, "i1", |b| b.field("item_type", "text"));
    let scope = h.scope();
    let u1 = UserId::new("u1");
    let u2 = UserId::new("u2");

    let opened = h.coordinator.open_for_edit(RecordKind::Item, &scope, &id, &u1).await;
    assert_eq!(opened.data["lock"]["status"], "acquired");

    let refused = h.coordinator.open_for_edit(RecordKind::Item, &scope, &id, &u2).await;
    assert_eq!(refused.data["lock"]["status"], "conflict");

    let not_owner = h
        .coordinator
        .unlock(RecordKind::Item, &scope, &id, &u2, UnlockOptions::default())
        .await;
    assert!(!not_owner.status);
    assert_eq!(not_owner.failure, Some(AckFailure::Refused));
    assert_eq!(not_owner.message, "Only the lock owner can unlock this record");

    let admin = h
        .coordinator
        .unlock(RecordKind::Item, &scope, &id, &UserId::new("root"), UnlockOptions::default())
        .await;
    assert!(admin.status);

    let reopened = h.coordinator.open_for_edit(RecordKind::Item, &scope, &id, &u2).await;
    assert_eq!(reopened.data["lock"]["status"], "acquired");
}

#[tokio::test]
async fn test_list_returns_active_siblings_in_order() {
    let h = Harness::new(false);
    h.seed(RecordKind::Heading, "b", |b| b.order(1));
    h.seed(RecordKind::Heading, "a", |b| b.order(0));
    h.seed(RecordKind::Heading, "gone", |b| b.order(2).deleted(true));

    let response = h.coordinator.list(RecordKind::Heading, &h.scope()).await;

    let uuids: Vec<&str> = response
        .data
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["uuid"].as_str().unwrap())
        .collect();
    assert_eq!(uuids, vec!["a", "b"]);
}

// ---------------------------------------------------------------------------
// update
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_update_merges_content_and_stamps_audit_fields() {
    let h = Harness::new(false);
    let id = h.seed(RecordKind::Item, "i1", |b| b.field("item_type", "text").field("title", "Old"));

    let response = h
        .coordinator
        .update(
            RecordKind::Item,
            &h.scope(),
            &id,
            json!({"title": "New", "styles": {"color": "red"}}),
            Some(UserId::new("bob")),
        )
        .await;

    assert_eq!(response.status, 200);
    let stored = h.record(RecordKind::Item, &id);
    assert_eq!(stored.content.get("title"), Some(&json!("New")));
    assert_eq!(stored.content.get("item_type"), Some(&json!("text")));
    assert_eq!(stored.styles.as_map().get("color"), Some(&json!("red")));
    assert_eq!(stored.updated, Some(test_clock().now()));
    assert_eq!(stored.updated_by, Some(UserId::new("bob")));
    assert!(h.scheduler.scheduled_keys().is_empty());
}

#[tokio::test]
async fn test_update_outcomes_for_invalid_missing_and_failing() {
    let h = Harness::new(false);
    let id = h.seed(RecordKind::Item, "i1", |b| b.field("item_type", "text"));

    let invalid = h
        .coordinator
        .update(RecordKind::Item, &h.scope(), &id, json!({"item_type": "gif"}), None)
        .await;
    assert_eq!(invalid.status, 400);
    assert_eq!(invalid.data[0]["field"], "item_type");

    let missing = h
        .coordinator
        .update(RecordKind::Item, &h.scope(), &RecordId::new("nope"), json!({"title": "x"}), None)
        .await;
    assert_eq!(missing.status, 200);
    assert!(missing.message.contains("not found"));

    h.store.set_failing(StoreOperation::Update, true);
    let failed = h
        .coordinator
        .update(RecordKind::Item, &h.scope(), &id, json!({"title": "x"}), None)
        .await;
    assert_eq!(failed.status, 500);
}

#[tokio::test]
async fn test_update_with_publish_flag_suppresses_then_republishes_after_delay() {
    let h = Harness::new(true);
    let id = h.seed_published(RecordKind::Heading, "h1", |b| b.field("text", "Old"));

    let response = h
        .coordinator
        .update(RecordKind::Heading, &h.scope(), &id, json!({"text": "New", "is_published": true}), None)
        .await;

    assert_eq!(response.status, 200);
    assert!(response.message.contains("republish scheduled"));

    // Suppressed right away, flag not persisted as content
    let stored = h.record(RecordKind::Heading, &id);
    assert!(!stored.is_published);
    assert!(!stored.content.contains_key("is_published"));
    assert!(!h.index.is_indexed(&id));

    let key = TaskKey::republish(RecordKind::Heading, &id);
    assert_eq!(h.scheduler.delay_of(&key), Some(common::REPUBLISH_DELAY));

    // The delayed publish re-indexes the edited record
    assert_eq!(h.scheduler.run(&key).await, Some(Ok(())));
    assert!(h.record(RecordKind::Heading, &id).is_published);
    assert!(h.index.is_indexed(&id));
}

#[tokio::test]
async fn test_failed_suppress_schedules_no_republish() {
    let h = Harness::new(true);
    let id = h.seed_published(RecordKind::Heading, "h1", |b| b.field("text", "Old"));
    h.index.set_fail_delete(true);

    let response = h
        .coordinator
        .update(RecordKind::Heading, &h.scope(), &id, json!({"text": "New", "is_published": "1"}), None)
        .await;

    // The content update itself succeeded
    assert_eq!(response.status, 200);
    assert!(response.message.contains("republish skipped"));
    assert_eq!(h.record(RecordKind::Heading, &id).content.get("text"), Some(&json!("New")));

    assert!(h.scheduler.scheduled_keys().is_empty());
    assert!(h.scheduler.history().is_empty());
    // Store was never flipped because the index did not confirm removal
    assert!(h.record(RecordKind::Heading, &id).is_published);
}

#[tokio::test]
async fn test_newer_update_cancels_pending_republish() {
    let h = Harness::new(true);
    let id = h.seed_published(RecordKind::Heading, "h1", |b| b.field("text", "Old"));
    let key = TaskKey::republish(RecordKind::Heading, &id);

    h.coordinator
        .update(RecordKind::Heading, &h.scope(), &id, json!({"text": "New", "is_published": true}), None)
        .await;
    assert!(h.scheduler.is_scheduled(&key));

    h.coordinator
        .update(RecordKind::Heading, &h.scope(), &id, json!({"text": "Newer"}), None)
        .await;

    assert!(!h.scheduler.is_scheduled(&key));
    assert_eq!(h.scheduler.cancelled(), vec![key]);
}

#[tokio::test]
async fn test_republish_task_reports_failure_when_exhibit_was_unpublished() {
    let h = Harness::new(true);
    let id = h.seed_published(RecordKind::Heading, "h1", |b| b.field("text", "Old"));
    h.coordinator
        .update(RecordKind::Heading, &h.scope(), &id, json!({"is_published": true}), None)
        .await;

    h.store.set_exhibit_published(&h.exhibit, false);
    let result = h.scheduler.run(&TaskKey::republish(RecordKind::Heading, &id)).await;

    // Not worth retrying
    assert_eq!(
        result.unwrap(),
        Err(TaskError::Permanent(
            "Unable to publish heading. Exhibit must be published first".to_string()
        ))
    );
    assert!(!h.record(RecordKind::Heading, &id).is_published);
}

#[tokio::test]
async fn test_republish_task_index_failure_is_transient() {
    let h = Harness::new(true);
    let id = h.seed_published(RecordKind::Heading, "h1", |b| b.field("text", "Old"));
    h.coordinator
        .update(RecordKind::Heading, &h.scope(), &id, json!({"is_published": true}), None)
        .await;

    h.index.set_fail_index(true);
    let result = h.scheduler.run(&TaskKey::republish(RecordKind::Heading, &id)).await;

    assert!(matches!(result, Some(Err(TaskError::Transient(_)))));
    assert!(!h.record(RecordKind::Heading, &id).is_published);
}

#[tokio::test]
async fn test_explicit_suppress_cancels_pending_republish() {
    let h = Harness::new(true);
    let id = h.seed_published(RecordKind::Heading, "h1", |b| b.field("text", "Old"));
    let key = TaskKey::republish(RecordKind::Heading, &id);
    h.coordinator
        .update(RecordKind::Heading, &h.scope(), &id, json!({"text": "New", "is_published": true}), None)
        .await;
    assert!(h.scheduler.is_scheduled(&key));

    let ack = h.coordinator.suppress(RecordKind::Heading, &h.scope(), &id).await;

    assert!(ack.status, "{}", ack.message);
    assert!(!h.scheduler.is_scheduled(&key));
    assert_eq!(h.scheduler.cancelled(), vec![key.clone()]);
    assert_eq!(h.scheduler.run(&key).await, None);
    assert!(!h.record(RecordKind::Heading, &id).is_published);
    assert!(!h.index.is_indexed(&id));
}

#[tokio::test]
async fn test_explicit_publish_cancels_pending_republish() {
    let h = Harness::new(true);
    let id = h.seed_published(RecordKind::Heading, "h1", |b| b.field("text", "Old"));
    let key = TaskKey::republish(RecordKind::Heading, &id);
    h.coordinator
        .update(RecordKind::Heading, &h.scope(), &id, json!({"is_published": true}), None)
        .await;

    let ack = h.coordinator.publish(RecordKind::Heading, &h.scope(), &id).await;

    assert!(ack.status, "{}", ack.message);
    assert!(!h.scheduler.is_scheduled(&key));
    assert!(h.record(RecordKind::Heading, &id).is_published);
}

// ---------------------------------------------------------------------------
// delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_delete_twice_is_idempotent() {
    let h = Harness::new(true);
    let id = h.seed_published(RecordKind::Heading, "h1", |b| b.locked_by("alice"));

    let first = h.coordinator.delete(RecordKind::Heading, &h.scope(), &id).await;
    let second = h.coordinator.delete(RecordKind::Heading, &h.scope(), &id).await;

    assert_eq!(first.status, 204);
    assert_eq!(second.status, 204);
    let stored = h.record(RecordKind::Heading, &id);
    assert!(stored.is_deleted);
    assert!(!stored.is_published);
    assert!(!stored.is_locked());
    assert!(!h.index.is_indexed(&id));
}

#[tokio::test]
async fn test_delete_proceeds_when_index_removal_fails() {
    let h = Harness::new(true);
    let id = h.seed_published(RecordKind::Item, "i1", |b| b);
    h.index.set_fail_delete(true);

    let response = h.coordinator.delete(RecordKind::Item, &h.scope(), &id).await;

    assert_eq!(response.status, 204);
    assert!(h.record(RecordKind::Item, &id).is_deleted);
    assert_eq!(h.index.calls(), vec![IndexCall::Delete(id)]);
}

#[tokio::test]
async fn test_delete_cancels_pending_republish() {
    let h = Harness::new(true);
    let id = h.seed_published(RecordKind::Heading, "h1", |b| b.field("text", "Old"));
    let key = TaskKey::republish(RecordKind::Heading, &id);
    h.coordinator
        .update(RecordKind::Heading, &h.scope(), &id, json!({"is_published": true}), None)
        .await;

    h.coordinator.delete(RecordKind::Heading, &h.scope(), &id).await;

    assert!(!h.scheduler.is_scheduled(&key));
    assert!(h.scheduler.cancelled().contains(&key));
}

#[tokio::test]
async fn test_deleting_a_grid_takes_its_items_along() {
    let h = Harness::new(true);
    let grid = h.seed_published(RecordKind::Grid, "g1", |b| b);
    let item = h.seed_published(RecordKind::GridItem, "gi1", |b| b.container(grid.clone()));
    let other = h.seed(RecordKind::GridItem, "gi2", |b| b.container(RecordId::new("g2")));

    let response = h.coordinator.delete(RecordKind::Grid, &h.scope(), &grid).await;

    assert_eq!(response.status, 204);
    assert!(h.record(RecordKind::Grid, &grid).is_deleted);
    assert!(h.record(RecordKind::GridItem, &item).is_deleted);
    assert!(h.record(RecordKind::GridItem, &item).held_by_container);
    assert!(!h.record(RecordKind::Grid, &grid).held_by_container);
    assert!(!h.index.is_indexed(&item));
    assert!(!h.record(RecordKind::GridItem, &other).is_deleted);
}

// ---------------------------------------------------------------------------
// publish / suppress
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_publish_requires_published_exhibit_and_touches_nothing() {
    let h = Harness::new(false);
    let id = h.seed(RecordKind::Heading, "h1", |b| b);

    let ack = h.coordinator.publish(RecordKind::Heading, &h.scope(), &id).await;

    assert!(!ack.status);
    assert_eq!(ack.failure, Some(AckFailure::Refused));
    assert_eq!(ack.message, "Unable to publish heading. Exhibit must be published first");
    assert!(h.index.calls().is_empty());
    assert!(!h.record(RecordKind::Heading, &id).is_published);
}

#[tokio::test]
async fn test_publish_and_suppress_of_missing_record_are_not_found() {
    let h = Harness::new(true);
    let missing = RecordId::new("nope");

    let published = h.coordinator.publish(RecordKind::Heading, &h.scope(), &missing).await;
    let suppressed = h.coordinator.suppress(RecordKind::Heading, &h.scope(), &missing).await;

    assert_eq!(published.failure, Some(AckFailure::NotFound));
    assert_eq!(suppressed.failure, Some(AckFailure::NotFound));
    assert_eq!(published.status_code(), 404);
}

#[tokio::test]
async fn test_publish_indexes_then_sets_flag() {
    let h = Harness::new(true);
    let id = h.seed(RecordKind::Heading, "h1", |b| b);

    let ack = h.coordinator.publish(RecordKind::Heading, &h.scope(), &id).await;

    assert!(ack.status, "{}", ack.message);
    assert!(h.record(RecordKind::Heading, &id).is_published);
    assert_eq!(
        h.index.calls(),
        vec![IndexCall::Index {
            kind: RecordKind::Heading,
            exhibit_id: h.exhibit.clone(),
            record_id: id,
        }]
    );
}

#[tokio::test]
async fn test_publish_nested_item_requires_published_container() {
    let h = Harness::new(true);
    h.seed(RecordKind::Timeline, "t1", |b| b.field("title", "Years"));
    let id = h.seed(RecordKind::TimelineItem, "ti1", |b| b.container(RecordId::new("t1")));

    let ack = h.coordinator.publish(RecordKind::TimelineItem, &h.nested("t1"), &id).await;

    assert!(!ack.status);
    assert_eq!(ack.message, "Unable to publish timeline item. Timeline must be published first");
    assert!(h.index.calls().is_empty());
}

#[tokio::test]
async fn test_publish_index_failure_leaves_store_unpublished() {
    let h = Harness::new(true);
    let id = h.seed(RecordKind::Heading, "h1", |b| b);
    h.index.set_fail_index(true);

    let ack = h.coordinator.publish(RecordKind::Heading, &h.scope(), &id).await;

    assert!(!ack.status);
    assert_eq!(ack.failure, Some(AckFailure::Index));
    assert!(!h.record(RecordKind::Heading, &id).is_published);
}

#[tokio::test]
async fn test_publish_store_failure_removes_index_entry_again() {
    let h = Harness::new(true);
    let id = h.seed(RecordKind::Heading, "h1", |b| b);
    h.store.set_failing(StoreOperation::Update, true);

    let ack = h.coordinator.publish(RecordKind::Heading, &h.scope(), &id).await;

    assert!(!ack.status);
    assert_eq!(ack.failure, Some(AckFailure::Store));
    assert!(!h.index.is_indexed(&id));
    assert!(matches!(h.index.calls().as_slice(), [IndexCall::Index { .. }, IndexCall::Delete(_)]));
}

#[tokio::test]
async fn test_publish_rejects_deleted_records() {
    let h = Harness::new(true);
    let id = h.seed(RecordKind::Heading, "h1", |b| b.deleted(true));

    let ack = h.coordinator.publish(RecordKind::Heading, &h.scope(), &id).await;

    assert!(!ack.status);
    assert!(h.index.calls().is_empty());
}

#[tokio::test]
async fn test_publishing_a_grid_publishes_the_items_it_held_back() {
    let h = Harness::new(true);
    let grid = h.seed(RecordKind::Grid, "g1", |b| b);
    let item = h.seed(RecordKind::GridItem, "gi1", |b| b.container(grid.clone()).held_by_container(true));
    let draft = h.seed(RecordKind::GridItem, "gi2", |b| b.container(grid.clone()));
    let deleted = h.seed(RecordKind::GridItem, "gi3", |b| {
        b.container(grid.clone()).deleted(true).held_by_container(true)
    });

    let ack = h.coordinator.publish(RecordKind::Grid, &h.scope(), &grid).await;

    assert!(ack.status);
    let published = h.record(RecordKind::GridItem, &item);
    assert!(published.is_published);
    assert!(!published.held_by_container);
    assert!(h.index.is_indexed(&item));
    assert!(!h.record(RecordKind::GridItem, &draft).is_published);
    assert!(!h.record(RecordKind::GridItem, &deleted).is_published);
}

#[tokio::test]
async fn test_grid_republish_keeps_items_suppressed_on_their_own() {
    let h = Harness::new(true);
    let grid = h.seed_published(RecordKind::Grid, "g1", |b| b);
    let chosen = h.seed_published(RecordKind::GridItem, "gi1", |b| b.container(grid.clone()));
    let cascaded = h.seed_published(RecordKind::GridItem, "gi2", |b| b.container(grid.clone()));

    assert!(h.coordinator.suppress(RecordKind::GridItem, &h.nested("g1"), &chosen).await.status);
    assert!(h.coordinator.suppress(RecordKind::Grid, &h.scope(), &grid).await.status);
    assert!(h.record(RecordKind::GridItem, &cascaded).held_by_container);
    assert!(!h.record(RecordKind::GridItem, &chosen).held_by_container);

    assert!(h.coordinator.publish(RecordKind::Grid, &h.scope(), &grid).await.status);

    assert!(h.record(RecordKind::GridItem, &cascaded).is_published);
    assert!(h.index.is_indexed(&cascaded));
    assert!(!h.record(RecordKind::GridItem, &chosen).is_published);
    assert!(!h.index.is_indexed(&chosen));
}

#[tokio::test]
async fn test_suppress_removes_from_index_then_clears_flag() {
    let h = Harness::new(true);
    let grid = h.seed_published(RecordKind::Grid, "g1", |b| b);
    let item = h.seed_published(RecordKind::GridItem, "gi1", |b| b.container(grid.clone()));

    let ack = h.coordinator.suppress(RecordKind::Grid, &h.scope(), &grid).await;

    assert!(ack.status);
    assert!(!h.record(RecordKind::Grid, &grid).is_published);
    assert!(!h.index.is_indexed(&grid));
    assert!(!h.record(RecordKind::GridItem, &item).is_published);
    assert!(h.record(RecordKind::GridItem, &item).held_by_container);
    assert!(!h.index.is_indexed(&item));
}

#[tokio::test]
async fn test_suppress_index_failure_leaves_store_published() {
    let h = Harness::new(true);
    let id = h.seed_published(RecordKind::Heading, "h1", |b| b);
    h.index.set_fail_delete(true);

    let ack = h.coordinator.suppress(RecordKind::Heading, &h.scope(), &id).await;

    assert!(!ack.status);
    assert_eq!(ack.status_code(), 502);
    assert!(h.record(RecordKind::Heading, &id).is_published);
    assert!(h.index.is_indexed(&id));
}

// ---------------------------------------------------------------------------
// reorder
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_reorder_all_reports_failures_per_item() {
    let h = Harness::new(false);
    let a = h.seed(RecordKind::Heading, "a", |b| b.order(0));
    let b = h.seed(RecordKind::Heading, "b", |b| b.order(1));

    let report = h
        .coordinator
        .reorder_all(
            RecordKind::Heading,
            &h.scope(),
            &[
                ReorderItem { uuid: a.clone(), order: 1 },
                ReorderItem { uuid: b.clone(), order: 0 },
                ReorderItem { uuid: RecordId::new("missing"), order: 2 },
            ],
        )
        .await;

    assert_eq!(report.updated, 2);
    assert_eq!(report.failed, vec![RecordId::new("missing")]);
    assert_eq!(h.record(RecordKind::Heading, &a).order, 1);
    assert_eq!(h.record(RecordKind::Heading, &b).order, 0);
}

#[tokio::test]
async fn test_reorder_returns_false_on_store_failure() {
    let h = Harness::new(false);
    let a = h.seed(RecordKind::Heading, "a", |b| b);
    h.store.set_failing(StoreOperation::Update, true);

    let moved = h
        .coordinator
        .reorder(RecordKind::Heading, &h.scope(), &ReorderItem { uuid: a, order: 5 })
        .await;

    assert!(!moved);
}
