//! In-memory applied-sequence log.
//!
//! Mirrors the database-backed protocol with a mutex-protected map and a
//! condvar for the bounded lock wait. Intended for tests/dev, but fully
//! honors the reservation semantics, including cross-thread contention.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::applied_log::{AppliedSequenceLog, Reservation};
use crate::error::TrackerError;

const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct Entry {
    value: u64,
    locked: bool,
}

#[derive(Debug, Default)]
struct Shared {
    entries: Mutex<HashMap<String, Entry>>,
    unlocked: Condvar,
}

/// In-memory applied-sequence log with a bounded lock wait.
#[derive(Debug, Clone)]
pub struct InMemoryAppliedLog {
    shared: Arc<Shared>,
    lock_wait: Duration,
}

impl Default for InMemoryAppliedLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAppliedLog {
    pub fn new() -> Self {
        Self::with_lock_wait(DEFAULT_LOCK_WAIT)
    }

    /// Use a custom lock-wait bound (tests use a short one).
    pub fn with_lock_wait(lock_wait: Duration) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            lock_wait,
        }
    }

    /// Read a cursor without reserving it (test/introspection helper).
    pub fn peek(&self, listener_id: &str) -> Option<u64> {
        self.shared
            .entries
            .lock()
            .ok()?
            .get(listener_id)
            .map(|entry| entry.value)
    }
}

impl AppliedSequenceLog for InMemoryAppliedLog {
    fn reserve(&self, listener_id: &str) -> Result<Box<dyn Reservation>, TrackerError> {
        let deadline = Instant::now() + self.lock_wait;
        let mut entries = self
            .shared
            .entries
            .lock()
            .map_err(|_| TrackerError::Storage("lock poisoned".to_string()))?;

        loop {
            let entry = entries.entry(listener_id.to_string()).or_default();
            if !entry.locked {
                entry.locked = true;
                let value = entry.value;
                return Ok(Box::new(InMemoryReservation {
                    shared: Arc::clone(&self.shared),
                    listener_id: listener_id.to_string(),
                    value,
                    done: false,
                }));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TrackerError::ReservationUnavailable(
                    listener_id.to_string(),
                ));
            }
            let (guard, timeout) = self
                .shared
                .unlocked
                .wait_timeout(entries, remaining)
                .map_err(|_| TrackerError::Storage("lock poisoned".to_string()))?;
            entries = guard;
            if timeout.timed_out() {
                return Err(TrackerError::ReservationUnavailable(
                    listener_id.to_string(),
                ));
            }
        }
    }
}

struct InMemoryReservation {
    shared: Arc<Shared>,
    listener_id: String,
    value: u64,
    done: bool,
}

impl InMemoryReservation {
    fn unlock(&self, new_value: Option<u64>) {
        if let Ok(mut entries) = self.shared.entries.lock() {
            if let Some(entry) = entries.get_mut(&self.listener_id) {
                if let Some(value) = new_value {
                    entry.value = value;
                }
                entry.locked = false;
            }
        }
        self.shared.unlocked.notify_all();
    }
}

impl Reservation for InMemoryReservation {
    fn highest_applied(&self) -> u64 {
        self.value
    }

    fn advance(mut self: Box<Self>, sequence: u64) -> Result<(), TrackerError> {
        if sequence < self.value {
            // Keep the lock's release path in Drop.
            return Err(TrackerError::CursorRegression {
                current: self.value,
                requested: sequence,
            });
        }
        self.unlock(Some(sequence));
        self.done = true;
        Ok(())
    }
}

impl Drop for InMemoryReservation {
    fn drop(&mut self) {
        if !self.done {
            self.unlock(None);
            self.done = true;
        }
    }
}
