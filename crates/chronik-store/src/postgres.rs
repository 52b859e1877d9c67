//! Postgres-backed storage backend.
//!
//! Events live in a single `chronik_events` table. The store-wide sequence
//! number is a `BIGSERIAL`; the per-stream version is assigned inside the
//! commit transaction by checking `MAX(version)` against the expected
//! version. Concurrent appends to the same stream race on the unique
//! `(stream_name, version)` constraint, which is mapped to a concurrency
//! error (SQLSTATE 23505).
//!
//! The [`EventStorage`] trait is synchronous; this implementation runs its
//! async sqlx operations through `tokio::runtime::Handle::block_on` and
//! therefore must be called from within a tokio runtime.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use chronik_core::{ExpectedVersion, StreamName};

use crate::error::{EventStoreError, EventStoreResult};
use crate::event::{RawEvent, WritableEvent, CORRELATION_ID};
use crate::filter::EventFilter;
use crate::storage::{EventStorage, StorageStatus};

const SELECT_COLUMNS: &str = "event_id, stream_name, event_type, payload, metadata, sequence_number, version, recorded_at";

/// Postgres-backed append-only event storage.
#[derive(Debug, Clone)]
pub struct PostgresEventStorage {
    pool: Arc<PgPool>,
}

impl PostgresEventStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn load_events(
        &self,
        filter: &EventFilter,
        limit: Option<i64>,
    ) -> EventStoreResult<Vec<RawEvent>> {
        let limit_clause = match limit {
            Some(n) => format!(" LIMIT {n}"),
            None => String::new(),
        };

        let rows = match filter {
            EventFilter::StreamName { stream } => {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM chronik_events \
                     WHERE stream_name = $1 \
                     ORDER BY sequence_number ASC{limit_clause}"
                );
                sqlx::query(&sql)
                    .bind(stream.as_str())
                    .fetch_all(&*self.pool)
                    .await
            }
            EventFilter::EventTypes {
                event_types,
                min_sequence,
            } => {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM chronik_events \
                     WHERE event_type = ANY($1) AND sequence_number >= $2 \
                     ORDER BY sequence_number ASC{limit_clause}"
                );
                sqlx::query(&sql)
                    .bind(event_types.clone())
                    .bind(*min_sequence as i64)
                    .fetch_all(&*self.pool)
                    .await
            }
            EventFilter::Correlation {
                correlation_id,
                max_sequence,
            } => {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM chronik_events \
                     WHERE metadata->>'{CORRELATION_ID}' = $1 AND sequence_number <= $2 \
                     ORDER BY sequence_number ASC{limit_clause}"
                );
                sqlx::query(&sql)
                    .bind(correlation_id)
                    .bind(*max_sequence as i64)
                    .fetch_all(&*self.pool)
                    .await
            }
        }
        .map_err(|e| map_sqlx_error("load", e))?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            events.push(raw_event_from_row(&row)?);
        }
        Ok(events)
    }

    #[instrument(skip(self, events), fields(stream = %stream, count = events.len()), err)]
    pub async fn commit_events(
        &self,
        stream: &StreamName,
        events: Vec<WritableEvent>,
        expected_version: ExpectedVersion,
    ) -> EventStoreResult<Vec<RawEvent>> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        let current = current_stream_version(&mut tx, stream).await?;
        if !expected_version.matches(current) {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(EventStoreError::Concurrency(format!(
                "stream \"{stream}\": expected {expected_version:?}, found {current}"
            )));
        }

        let mut committed = Vec::with_capacity(events.len());
        let mut next_version = current + 1;
        for event in events {
            let metadata = serde_json::to_value(&event.metadata)
                .map_err(|e| EventStoreError::Codec(format!("metadata serialization: {e}")))?;

            let row = sqlx::query(
                r#"
                INSERT INTO chronik_events (event_id, stream_name, event_type, payload, metadata, version)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING sequence_number, recorded_at
                "#,
            )
            .bind(event.event_id)
            .bind(stream.as_str())
            .bind(&event.event_type)
            .bind(&event.payload)
            .bind(&metadata)
            .bind(next_version as i64)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    EventStoreError::Concurrency(format!(
                        "concurrent append detected on stream \"{stream}\" at version {next_version}"
                    ))
                } else {
                    map_sqlx_error("insert", e)
                }
            })?;

            let sequence_number: i64 = row
                .try_get("sequence_number")
                .map_err(|e| map_sqlx_error("insert", e))?;
            let recorded_at: DateTime<Utc> = row
                .try_get("recorded_at")
                .map_err(|e| map_sqlx_error("insert", e))?;

            committed.push(RawEvent {
                event_id: event.event_id,
                stream: stream.clone(),
                event_type: event.event_type,
                payload: event.payload,
                metadata: event.metadata,
                sequence_number: sequence_number as u64,
                version: next_version,
                recorded_at,
            });
            next_version += 1;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;

        Ok(committed)
    }

    pub async fn check_status(&self) -> EventStoreResult<StorageStatus> {
        let reachable = sqlx::query("SELECT 1").fetch_one(&*self.pool).await.is_ok();
        Ok(StorageStatus {
            backend: "postgres".to_string(),
            reachable,
            detail: None,
        })
    }

    /// Provision the event and applied-log tables (idempotent).
    pub async fn provision(&self) -> EventStoreResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS chronik_events (
                sequence_number BIGSERIAL PRIMARY KEY,
                event_id UUID NOT NULL UNIQUE,
                stream_name TEXT NOT NULL,
                event_type TEXT NOT NULL,
                payload JSONB NOT NULL,
                metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
                version BIGINT NOT NULL CHECK (version > 0),
                recorded_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (stream_name, version)
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS chronik_events_type_seq
                ON chronik_events (event_type, sequence_number)
            "#,
            &format!(
                r#"
                CREATE INDEX IF NOT EXISTS chronik_events_correlation
                    ON chronik_events ((metadata->>'{CORRELATION_ID}'))
                "#
            ),
            r#"
            CREATE TABLE IF NOT EXISTS chronik_applied_log (
                listener_id TEXT PRIMARY KEY,
                highest_applied BIGINT NOT NULL DEFAULT 0
            )
            "#,
        ];
        for sql in statements {
            sqlx::query(sql)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("setup", e))?;
        }
        Ok(())
    }
}

async fn current_stream_version(
    tx: &mut Transaction<'_, Postgres>,
    stream: &StreamName,
) -> EventStoreResult<u64> {
    let row = sqlx::query(
        "SELECT COALESCE(MAX(version), 0) AS current_version FROM chronik_events WHERE stream_name = $1",
    )
    .bind(stream.as_str())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("current_version", e))?;

    let current: i64 = row
        .try_get("current_version")
        .map_err(|e| map_sqlx_error("current_version", e))?;
    Ok(current as u64)
}

fn raw_event_from_row(row: &sqlx::postgres::PgRow) -> EventStoreResult<RawEvent> {
    let read = |e: sqlx::Error| map_sqlx_error("row", e);

    let stream_name: String = row.try_get("stream_name").map_err(read)?;
    let stream = StreamName::new(stream_name)
        .map_err(|e| EventStoreError::Storage(format!("invalid stored stream name: {e}")))?;
    let metadata_value: JsonValue = row.try_get("metadata").map_err(read)?;
    let metadata: BTreeMap<String, String> = serde_json::from_value(metadata_value)
        .map_err(|e| EventStoreError::Storage(format!("invalid stored metadata: {e}")))?;
    let sequence_number: i64 = row.try_get("sequence_number").map_err(read)?;
    let version: i64 = row.try_get("version").map_err(read)?;

    Ok(RawEvent {
        event_id: row.try_get("event_id").map_err(read)?,
        stream,
        event_type: row.try_get("event_type").map_err(read)?,
        payload: row.try_get("payload").map_err(read)?,
        metadata,
        sequence_number: sequence_number as u64,
        version: version as u64,
        recorded_at: row.try_get("recorded_at").map_err(read)?,
    })
}

/// Map sqlx errors to [`EventStoreError`], folding unique violations into
/// the concurrency variant.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> EventStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => EventStoreError::Concurrency(msg),
                _ => EventStoreError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            EventStoreError::Storage(format!("connection pool closed in {operation}"))
        }
        other => EventStoreError::Storage(format!("sqlx error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23505");
    }
    false
}

fn runtime_handle() -> EventStoreResult<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        EventStoreError::Storage(
            "PostgresEventStorage requires a tokio runtime context".to_string(),
        )
    })
}

impl EventStorage for PostgresEventStorage {
    fn load(&self, filter: &EventFilter) -> EventStoreResult<Vec<RawEvent>> {
        runtime_handle()?.block_on(self.load_events(filter, None))
    }

    fn load_first(&self, filter: &EventFilter) -> EventStoreResult<Option<RawEvent>> {
        let events = runtime_handle()?.block_on(self.load_events(filter, Some(1)))?;
        Ok(events.into_iter().next())
    }

    fn commit(
        &self,
        stream: &StreamName,
        events: Vec<WritableEvent>,
        expected_version: ExpectedVersion,
    ) -> EventStoreResult<Vec<RawEvent>> {
        runtime_handle()?.block_on(self.commit_events(stream, events, expected_version))
    }

    fn status(&self) -> EventStoreResult<StorageStatus> {
        runtime_handle()?.block_on(self.check_status())
    }

    fn setup(&self) -> EventStoreResult<()> {
        runtime_handle()?.block_on(self.provision())
    }
}
