//! Postgres-backed applied-sequence log.
//!
//! A reservation is an open transaction holding a `SELECT ... FOR UPDATE`
//! row lock on the listener's `chronik_applied_log` row. `SET LOCAL
//! lock_timeout` bounds the wait; a lock timeout (SQLSTATE 55P03) surfaces
//! as [`TrackerError::ReservationUnavailable`]. Dropping a reservation drops
//! the transaction, which rolls back and releases the lock without touching
//! the cursor.

use std::sync::Arc;
use std::time::Duration;

use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use crate::applied_log::{AppliedSequenceLog, Reservation};
use crate::error::TrackerError;

const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(1);

/// Applied-sequence log stored in the `chronik_applied_log` table.
#[derive(Debug, Clone)]
pub struct PostgresAppliedLog {
    pool: Arc<PgPool>,
    lock_wait: Duration,
}

impl PostgresAppliedLog {
    pub fn new(pool: PgPool) -> Self {
        Self::with_lock_wait(pool, DEFAULT_LOCK_WAIT)
    }

    pub fn with_lock_wait(pool: PgPool, lock_wait: Duration) -> Self {
        Self {
            pool: Arc::new(pool),
            lock_wait,
        }
    }

    #[instrument(skip(self), err)]
    async fn acquire(&self, listener_id: &str) -> Result<PostgresReservation, TrackerError> {
        // The row is created lazily so listeners need no registration step.
        // Insert outside the locking transaction so a retry sees it.
        sqlx::query(
            "INSERT INTO chronik_applied_log (listener_id, highest_applied) \
             VALUES ($1, 0) ON CONFLICT (listener_id) DO NOTHING",
        )
        .bind(listener_id)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(listener_id, e))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(listener_id, e))?;

        let timeout_ms = self.lock_wait.as_millis().max(1);
        sqlx::query(&format!("SET LOCAL lock_timeout = '{timeout_ms}ms'"))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(listener_id, e))?;

        let row = sqlx::query(
            "SELECT highest_applied FROM chronik_applied_log \
             WHERE listener_id = $1 FOR UPDATE",
        )
        .bind(listener_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error(listener_id, e))?;

        let highest_applied: i64 = row
            .try_get("highest_applied")
            .map_err(|e| map_sqlx_error(listener_id, e))?;

        Ok(PostgresReservation {
            tx: Some(tx),
            listener_id: listener_id.to_string(),
            value: highest_applied as u64,
        })
    }
}

impl AppliedSequenceLog for PostgresAppliedLog {
    fn reserve(&self, listener_id: &str) -> Result<Box<dyn Reservation>, TrackerError> {
        let reservation = runtime_handle()?.block_on(self.acquire(listener_id))?;
        Ok(Box::new(reservation))
    }
}

struct PostgresReservation {
    tx: Option<Transaction<'static, Postgres>>,
    listener_id: String,
    value: u64,
}

impl Reservation for PostgresReservation {
    fn highest_applied(&self) -> u64 {
        self.value
    }

    fn advance(mut self: Box<Self>, sequence: u64) -> Result<(), TrackerError> {
        if sequence < self.value {
            return Err(TrackerError::CursorRegression {
                current: self.value,
                requested: sequence,
            });
        }
        // Taking the transaction out disables the rollback-on-drop path.
        let mut tx = self
            .tx
            .take()
            .ok_or_else(|| TrackerError::Storage("reservation already consumed".to_string()))?;
        let listener_id = self.listener_id.clone();

        runtime_handle()?.block_on(async move {
            sqlx::query(
                "UPDATE chronik_applied_log SET highest_applied = $2 WHERE listener_id = $1",
            )
            .bind(&listener_id)
            .bind(sequence as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(&listener_id, e))?;

            tx.commit()
                .await
                .map_err(|e| map_sqlx_error(&listener_id, e))
        })
    }
}

// Dropping `tx` rolls the transaction back, releasing the row lock and
// discarding any uncommitted advance.

fn map_sqlx_error(listener_id: &str, err: sqlx::Error) -> TrackerError {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("55P03") => {
            TrackerError::ReservationUnavailable(listener_id.to_string())
        }
        sqlx::Error::Database(db_err) => TrackerError::Storage(format!(
            "database error for listener \"{listener_id}\": {}",
            db_err.message()
        )),
        other => TrackerError::Storage(format!(
            "sqlx error for listener \"{listener_id}\": {other}"
        )),
    }
}

fn runtime_handle() -> Result<tokio::runtime::Handle, TrackerError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        TrackerError::Storage("PostgresAppliedLog requires a tokio runtime context".to_string())
    })
}
