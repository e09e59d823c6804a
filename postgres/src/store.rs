//! `PostgreSQL` implementation of [`RecordStore`].

use crate::sql::{RECORD_COLUMNS, push_assignments, push_filter};
use exhibits_core::record::{ExhibitId, ExhibitSummary, Record, RecordId, RecordKind, Scope, Styles, UserId};
use exhibits_core::record_store::{RecordFilter, RecordPatch, RecordStore, RecordStoreError, StoreFuture};
use exhibits_core::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};
use std::future::Future;
use std::time::{Duration, Instant};

/// Connection pool settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// PostgreSQL-backed record store.
///
/// Each [`RecordKind`] maps to its own table (see `migrations/`). Reads and
/// writes are single statements, so each call is atomic on its own; inserts
/// additionally run inside an explicit transaction.
///
/// # Example
///
/// ```ignore
/// use exhibits_postgres::{PoolConfig, PostgresRecordStore};
///
/// let store = PostgresRecordStore::connect("postgres://localhost/exhibits", &PoolConfig::default()).await?;
/// store.migrate().await?;
/// ```
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Create a record store from an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` with the given pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Database`] if no connection can be established.
    pub async fn connect(database_url: &str, config: &PoolConfig) -> Result<Self, RecordStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| RecordStoreError::Database(format!("Failed to connect: {e}")))?;

        tracing::info!(max_connections = config.max_connections, "Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), RecordStoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Database(format!("Migration failed: {e}")))
    }

    /// Round-trip a trivial query; used by readiness checks.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Database`] if the database does not answer.
    pub async fn ping(&self) -> Result<(), RecordStoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| database_error("ping", &e))
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_record(&self, record: Record) -> Result<(), RecordStoreError> {
        let kind = record.kind;
        let container_column = kind.descriptor().container_column;

        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} (uuid, is_member_of_exhibit", kind.table()));
        if let Some(column) = container_column {
            builder.push(", ").push(column);
        }
        builder.push(
            r#", "order", is_published, is_locked, locked_by_user, is_deleted, held_by_container, styles, content, created, created_by, updated, updated_by) VALUES ("#,
        );

        let mut values = builder.separated(", ");
        values.push_bind(record.uuid.as_str().to_owned());
        values.push_bind(record.is_member_of_exhibit.as_str().to_owned());
        if container_column.is_some() {
            values.push_bind(record.container.as_ref().map(|c| c.as_str().to_owned()));
        }
        values.push_bind(record.order);
        values.push_bind(record.is_published);
        values.push_bind(record.locked_by_user.is_some());
        values.push_bind(record.locked_by_user.as_ref().map(|u| u.as_str().to_owned()));
        values.push_bind(record.is_deleted);
        values.push_bind(record.held_by_container);
        values.push_bind(record.styles.to_json_string());
        values.push_bind(Json(record.content.clone()));
        values.push_bind(record.created);
        values.push_bind(record.created_by.as_ref().map(|u| u.as_str().to_owned()));
        values.push_bind(record.updated);
        values.push_bind(record.updated_by.as_ref().map(|u| u.as_str().to_owned()));
        values.push_unseparated(")");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RecordStoreError::Transaction(format!("Failed to begin transaction: {e}")))?;

        builder.build().execute(&mut *tx).await.map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return RecordStoreError::Duplicate(record.uuid.clone());
                }
            }
            database_error("insert", &e)
        })?;

        tx.commit()
            .await
            .map_err(|e| RecordStoreError::Transaction(format!("Failed to commit transaction: {e}")))
    }

    async fn select_records(&self, kind: RecordKind, filter: RecordFilter) -> Result<Vec<Record>, RecordStoreError> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!("SELECT {RECORD_COLUMNS}"));
        if let Some(column) = kind.descriptor().container_column {
            builder.push(format_args!(", {column}"));
        }
        builder.push(format_args!(" FROM {}", kind.table()));
        push_filter(&mut builder, kind, &filter);
        builder.push(r#" ORDER BY "order", created"#);

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| database_error("select", &e))?;

        rows.iter().map(|row| decode_record(kind, row)).collect()
    }

    async fn update_records(
        &self,
        kind: RecordKind,
        filter: RecordFilter,
        patch: RecordPatch,
    ) -> Result<u64, RecordStoreError> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!("UPDATE {}", kind.table()));
        push_assignments(&mut builder, &patch);
        push_filter(&mut builder, kind, &filter);

        builder
            .build()
            .execute(&self.pool)
            .await
            .map(|result| result.rows_affected())
            .map_err(|e| database_error("update", &e))
    }

    async fn purge_records(&self, kind: RecordKind, filter: RecordFilter) -> Result<u64, RecordStoreError> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!("DELETE FROM {}", kind.table()));
        push_filter(&mut builder, kind, &filter);

        builder
            .build()
            .execute(&self.pool)
            .await
            .map(|result| result.rows_affected())
            .map_err(|e| database_error("purge", &e))
    }

    async fn max_order_of(&self, kind: RecordKind, scope: Scope) -> Result<Option<i64>, RecordStoreError> {
        let mut builder: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!(r#"SELECT MAX("order") FROM {}"#, kind.table()));
        builder
            .push(" WHERE is_member_of_exhibit = ")
            .push_bind(scope.exhibit_id.as_str().to_owned());
        if let (Some(column), Some(container)) = (kind.descriptor().container_column, &scope.container) {
            builder
                .push(format_args!(" AND {column} = "))
                .push_bind(container.as_str().to_owned());
        }

        builder
            .build_query_scalar::<Option<i64>>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| database_error("max_order", &e))
    }

    async fn find_exhibit(&self, exhibit_id: ExhibitId) -> Result<Option<ExhibitSummary>, RecordStoreError> {
        let row = sqlx::query("SELECT uuid, is_published, updated, updated_by FROM exhibits WHERE uuid = $1 AND is_deleted = FALSE")
            .bind(exhibit_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error("exhibit", &e))?;

        row.map(|row| {
            Ok(ExhibitSummary {
                uuid: ExhibitId::new(column::<String>(&row, "uuid")?),
                is_published: column(&row, "is_published")?,
                updated: column(&row, "updated")?,
                updated_by: column::<Option<String>>(&row, "updated_by")?.map(UserId::new),
            })
        })
        .transpose()
    }

    async fn touch(&self, exhibit_id: ExhibitId, at: DateTime<Utc>, by: Option<UserId>) -> Result<u64, RecordStoreError> {
        sqlx::query("UPDATE exhibits SET updated = $2, updated_by = $3 WHERE uuid = $1")
            .bind(exhibit_id.as_str())
            .bind(at)
            .bind(by.as_ref().map(UserId::as_str))
            .execute(&self.pool)
            .await
            .map(|result| result.rows_affected())
            .map_err(|e| database_error("touch_exhibit", &e))
    }
}

impl RecordStore for PostgresRecordStore {
    fn insert(&self, record: Record) -> StoreFuture<'_, ()> {
        Box::pin(timed("insert", self.insert_record(record)))
    }

    fn select(&self, kind: RecordKind, filter: RecordFilter) -> StoreFuture<'_, Vec<Record>> {
        Box::pin(timed("select", self.select_records(kind, filter)))
    }

    fn update(&self, kind: RecordKind, filter: RecordFilter, patch: RecordPatch) -> StoreFuture<'_, u64> {
        Box::pin(timed("update", self.update_records(kind, filter, patch)))
    }

    fn purge(&self, kind: RecordKind, filter: RecordFilter) -> StoreFuture<'_, u64> {
        Box::pin(timed("purge", self.purge_records(kind, filter)))
    }

    fn max_order(&self, kind: RecordKind, scope: Scope) -> StoreFuture<'_, Option<i64>> {
        Box::pin(timed("max_order", self.max_order_of(kind, scope)))
    }

    fn exhibit(&self, exhibit_id: ExhibitId) -> StoreFuture<'_, Option<ExhibitSummary>> {
        Box::pin(timed("exhibit", self.find_exhibit(exhibit_id)))
    }

    fn touch_exhibit(&self, exhibit_id: ExhibitId, at: DateTime<Utc>, by: Option<UserId>) -> StoreFuture<'_, u64> {
        Box::pin(timed("touch_exhibit", self.touch(exhibit_id, at, by)))
    }
}

/// Record query latency under `record_store_query_duration_seconds{operation}`.
async fn timed<T>(
    operation: &'static str,
    fut: impl Future<Output = Result<T, RecordStoreError>>,
) -> Result<T, RecordStoreError> {
    let start = Instant::now();
    let result = fut.await;
    metrics::histogram!("record_store_query_duration_seconds", "operation" => operation)
        .record(start.elapsed().as_secs_f64());
    if result.is_err() {
        metrics::counter!("record_store_errors_total", "operation" => operation).increment(1);
    }
    result
}

fn database_error(operation: &'static str, error: &sqlx::Error) -> RecordStoreError {
    tracing::error!(operation, error = %error, "Record store query failed");
    RecordStoreError::Database(format!("{operation} failed: {error}"))
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, RecordStoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| RecordStoreError::Database(format!("Failed to read column {name}: {e}")))
}

fn decode_record(kind: RecordKind, row: &PgRow) -> Result<Record, RecordStoreError> {
    let uuid = RecordId::new(column::<String>(row, "uuid")?);
    let corrupt = |reason: String| RecordStoreError::Corrupt {
        uuid: uuid.clone(),
        reason,
    };

    let container = match kind.descriptor().container_column {
        Some(name) => Some(RecordId::new(column::<String>(row, name)?)),
        None => None,
    };
    let styles = Styles::parse(&column::<String>(row, "styles")?).map_err(|e| corrupt(e.to_string()))?;
    let content = match column::<Json<Value>>(row, "content")?.0 {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => return Err(corrupt(format!("content is not an object: {other}"))),
    };

    Ok(Record {
        kind,
        is_member_of_exhibit: ExhibitId::new(column::<String>(row, "is_member_of_exhibit")?),
        container,
        order: column(row, "order")?,
        is_published: column(row, "is_published")?,
        locked_by_user: column::<Option<String>>(row, "locked_by_user")?.map(UserId::new),
        is_deleted: column(row, "is_deleted")?,
        held_by_container: column(row, "held_by_container")?,
        styles,
        content,
        created: column(row, "created")?,
        created_by: column::<Option<String>>(row, "created_by")?.map(UserId::new),
        updated: column(row, "updated")?,
        updated_by: column::<Option<String>>(row, "updated_by")?.map(UserId::new),
        uuid,
    })
}
