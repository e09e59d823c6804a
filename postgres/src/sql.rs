//! SQL fragments for record filters and patches.
//!
//! Every kind lives in its own table with the same columns, so statements are
//! assembled at runtime from the kind's table name with [`QueryBuilder`] and
//! bound parameters. Table and column names come from the static
//! [`KindDescriptor`](exhibits_core::KindDescriptor) and are never user input.

use exhibits_core::record::RecordKind;
use exhibits_core::record_store::{LockChange, LockGuard, RecordFilter, RecordPatch, Visibility};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

/// Columns selected for every record read.
pub(crate) const RECORD_COLUMNS: &str = r#"uuid, is_member_of_exhibit, "order", is_published, locked_by_user, is_deleted, held_by_container, styles, content, created, created_by, updated, updated_by"#;

/// Append `WHERE ...` for `filter` on a table of `kind`.
pub(crate) fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, kind: RecordKind, filter: &RecordFilter) {
    builder
        .push(" WHERE is_member_of_exhibit = ")
        .push_bind(filter.exhibit_id.as_str().to_owned());

    if let (Some(column), Some(container)) = (kind.descriptor().container_column, &filter.container) {
        builder
            .push(format_args!(" AND {column} = "))
            .push_bind(container.as_str().to_owned());
    }
    if let Some(uuid) = &filter.uuid {
        builder.push(" AND uuid = ").push_bind(uuid.as_str().to_owned());
    }

    match filter.visibility {
        Visibility::Active => {
            builder.push(" AND is_deleted = FALSE");
        }
        Visibility::Deleted => {
            builder.push(" AND is_deleted = TRUE");
        }
        Visibility::Any => {}
    }

    if let Some(published) = filter.published {
        builder.push(" AND is_published = ").push_bind(published);
    }
    if let Some(held) = filter.held_by_container {
        builder.push(" AND held_by_container = ").push_bind(held);
    }

    match &filter.lock {
        None => {}
        Some(LockGuard::Unlocked) => {
            builder.push(" AND locked_by_user IS NULL");
        }
        Some(LockGuard::LockableBy(user)) => {
            builder
                .push(" AND (locked_by_user IS NULL OR locked_by_user = ")
                .push_bind(user.as_str().to_owned())
                .push(")");
        }
        Some(LockGuard::HeldBy(user)) => {
            builder
                .push(" AND locked_by_user = ")
                .push_bind(user.as_str().to_owned());
        }
    }
}

/// Append `SET ...` for `patch`.
///
/// Content is merged into the stored JSONB object with `||`, so keys missing
/// from the patch keep their value.
pub(crate) fn push_assignments(builder: &mut QueryBuilder<'_, Postgres>, patch: &RecordPatch) {
    builder.push(" SET ");
    let mut assigned = false;

    if let Some(content) = &patch.content {
        set(builder, &mut assigned, "content").push("content || ").push_bind(Json(content.clone()));
    }
    if let Some(styles) = &patch.styles {
        set(builder, &mut assigned, "styles").push_bind(styles.to_json_string());
    }
    if let Some(order) = patch.order {
        set(builder, &mut assigned, r#""order""#).push_bind(order);
    }
    if let Some(published) = patch.published {
        set(builder, &mut assigned, "is_published").push_bind(published);
    }
    if let Some(deleted) = patch.deleted {
        set(builder, &mut assigned, "is_deleted").push_bind(deleted);
    }
    if let Some(held) = patch.held_by_container {
        set(builder, &mut assigned, "held_by_container").push_bind(held);
    }
    match &patch.lock {
        Some(LockChange::Acquire(user)) => {
            set(builder, &mut assigned, "is_locked").push("TRUE");
            set(builder, &mut assigned, "locked_by_user").push_bind(user.as_str().to_owned());
        }
        Some(LockChange::Release) => {
            set(builder, &mut assigned, "is_locked").push("FALSE");
            set(builder, &mut assigned, "locked_by_user").push("NULL");
        }
        None => {}
    }
    if let Some((at, by)) = &patch.updated {
        set(builder, &mut assigned, "updated").push_bind(*at);
        set(builder, &mut assigned, "updated_by").push_bind(by.as_ref().map(|user| user.as_str().to_owned()));
    }

    // An empty patch still has to be a valid statement that reports matched rows.
    if !assigned {
        builder.push("uuid = uuid");
    }
}

fn set<'b, 'args>(
    builder: &'b mut QueryBuilder<'args, Postgres>,
    assigned: &mut bool,
    column: &str,
) -> &'b mut QueryBuilder<'args, Postgres> {
    if *assigned {
        builder.push(", ");
    }
    *assigned = true;
    builder.push(column).push(" = ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use exhibits_core::record::{ExhibitId, RecordId, Scope, UserId};
    use exhibits_core::Utc;
    use serde_json::{Map, Value};

    fn update_sql(kind: RecordKind, filter: &RecordFilter, patch: &RecordPatch) -> String {
        let mut builder = QueryBuilder::new(format!("UPDATE {}", kind.table()));
        push_assignments(&mut builder, patch);
        push_filter(&mut builder, kind, filter);
        builder.sql().to_owned()
    }

    #[test]
    fn test_lock_acquire_is_one_conditional_update() {
        let scope = Scope::exhibit(ExhibitId::new("e1"));
        let alice = UserId::new("alice");
        let filter = RecordFilter::record(&scope, &RecordId::new("h1"))
            .with_lock(LockGuard::LockableBy(alice.clone()));

        let sql = update_sql(
            RecordKind::Heading,
            &filter,
            &RecordPatch::new().lock(LockChange::Acquire(alice)),
        );

        assert_eq!(
            sql,
            "UPDATE exhibit_headings SET is_locked = TRUE, locked_by_user = $1 \
             WHERE is_member_of_exhibit = $2 AND uuid = $3 AND is_deleted = FALSE \
             AND (locked_by_user IS NULL OR locked_by_user = $4)"
        );
    }

    #[test]
    fn test_nested_filter_uses_container_column() {
        let scope = Scope::nested(ExhibitId::new("e1"), RecordId::new("g1"));
        let filter = RecordFilter::scope(&scope).with_visibility(Visibility::Any);

        let mut builder = QueryBuilder::new("DELETE FROM grid_items");
        push_filter(&mut builder, RecordKind::GridItem, &filter);

        assert_eq!(
            builder.sql(),
            "DELETE FROM grid_items WHERE is_member_of_exhibit = $1 AND is_member_of_grid = $2"
        );
    }

    #[test]
    fn test_patch_merges_content_and_stamps_audit_columns() {
        let scope = Scope::exhibit(ExhibitId::new("e1"));
        let mut content = Map::new();
        content.insert("text".into(), Value::from("new"));
        let patch = RecordPatch::new()
            .content(content)
            .lock(LockChange::Release)
            .updated(Utc::now(), None);

        let sql = update_sql(RecordKind::Item, &RecordFilter::scope(&scope), &patch);

        assert!(sql.starts_with(
            "UPDATE exhibit_items SET content = content || $1, is_locked = FALSE, \
             locked_by_user = NULL, updated = $2, updated_by = $3 WHERE"
        ));
    }

    #[test]
    fn test_empty_patch_is_still_valid_sql() {
        let scope = Scope::exhibit(ExhibitId::new("e1"));
        let sql = update_sql(RecordKind::Heading, &RecordFilter::scope(&scope), &RecordPatch::new());
        assert!(sql.starts_with("UPDATE exhibit_headings SET uuid = uuid WHERE"));
    }

    #[test]
    fn test_container_hold_is_filtered_and_assigned() {
        let scope = Scope::nested(ExhibitId::new("e1"), RecordId::new("g1"));
        let filter = RecordFilter::scope(&scope).with_held_by_container(true);
        let patch = RecordPatch::new().published(true).held_by_container(false);

        let sql = update_sql(RecordKind::GridItem, &filter, &patch);

        assert_eq!(
            sql,
            "UPDATE grid_items SET is_published = $1, held_by_container = $2 \
             WHERE is_member_of_exhibit = $3 AND is_member_of_grid = $4 AND is_deleted = FALSE \
             AND held_by_container = $5"
        );
    }
}
