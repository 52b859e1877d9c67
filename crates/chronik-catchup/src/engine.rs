//! The catch-up pass.
//!
//! One pass walks every registered listener and drains its backlog with an
//! iterative loop: reserve the cursor, fetch the next unseen matching
//! event, dispatch, advance, repeat. Listeners fail independently; a stuck
//! listener never blocks the others.

use std::sync::Arc;

use chronik_store::{EventFilter, EventStore};
use tracing::{debug, error, warn};

use crate::applied_log::AppliedSequenceLog;
use crate::dispatcher::ListenerDispatcher;
use crate::error::{CatchUpError, TrackerError};
use crate::registry::{ListenerRegistry, Registration};

/// Outcome of one listener failing during a pass.
#[derive(Debug)]
pub struct ListenerFailure {
    pub listener_id: String,
    pub error: CatchUpError,
}

/// What one full pass accomplished.
#[derive(Debug, Default)]
pub struct PassSummary {
    /// Events successfully applied across all listeners.
    pub events_applied: u64,
    /// Listeners skipped because their cursor was reserved elsewhere.
    pub listeners_skipped: u64,
    pub failures: Vec<ListenerFailure>,
}

impl PassSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives listeners forward over the store's global sequence.
///
/// All collaborators are explicit; the engine holds no global state and any
/// number of engines (in any number of processes) may run against the same
/// store. The per-listener cursor reservation is the only mutual exclusion.
pub struct CatchUpEngine<E> {
    store: Arc<EventStore<E>>,
    applied_log: Arc<dyn AppliedSequenceLog>,
    registry: Arc<ListenerRegistry<E>>,
    dispatcher: ListenerDispatcher<E>,
}

impl<E> CatchUpEngine<E> {
    pub fn new(
        store: Arc<EventStore<E>>,
        applied_log: Arc<dyn AppliedSequenceLog>,
        registry: Arc<ListenerRegistry<E>>,
    ) -> Self {
        let dispatcher = ListenerDispatcher::new(Arc::clone(&store));
        Self {
            store,
            applied_log,
            registry,
            dispatcher,
        }
    }

    /// Run one catch-up pass over every registered listener.
    pub fn run_once(&self) -> PassSummary {
        let mut summary = PassSummary::default();
        for registration in self.registry.registrations() {
            self.drain_listener(registration, &mut summary);
        }
        summary
    }

    /// Drain one listener's backlog until it is caught up, fails, or its
    /// cursor is contended.
    fn drain_listener(&self, registration: &Registration<E>, summary: &mut PassSummary) {
        let listener_id = registration.listener_id.as_str();
        loop {
            let reservation = match self.applied_log.reserve(listener_id) {
                Ok(reservation) => reservation,
                Err(TrackerError::ReservationUnavailable(_)) => {
                    debug!(listener_id, "cursor reserved elsewhere, skipping");
                    summary.listeners_skipped += 1;
                    return;
                }
                Err(err) => {
                    error!(listener_id, error = %err, "cursor reservation failed");
                    summary.failures.push(ListenerFailure {
                        listener_id: listener_id.to_string(),
                        error: err.into(),
                    });
                    return;
                }
            };

            let cursor = reservation.highest_applied();
            let next = EventFilter::event_types(registration.event_types.clone(), cursor + 1)
                .and_then(|filter| self.store.first(&filter));
            let (event, raw) = match next {
                Ok(Some(found)) => found,
                Ok(None) => {
                    // Caught up. Dropping the reservation releases the lock.
                    debug!(listener_id, cursor, "no more events");
                    return;
                }
                Err(err) => {
                    error!(listener_id, error = %err, "fetching next event failed");
                    summary.failures.push(ListenerFailure {
                        listener_id: listener_id.to_string(),
                        error: err.into(),
                    });
                    return;
                }
            };

            if let Err(source) = self.dispatcher.dispatch(registration, &event, &raw) {
                // The reservation drops unadvanced: this event is
                // redelivered on the next pass.
                error!(
                    listener_id,
                    event_type = %raw.event_type,
                    sequence = raw.sequence_number,
                    error = %source,
                    "listener application failed"
                );
                summary.failures.push(ListenerFailure {
                    listener_id: listener_id.to_string(),
                    error: CatchUpError::ListenerApplicationFailed {
                        listener_id: listener_id.to_string(),
                        event_type: raw.event_type.clone(),
                        sequence_number: raw.sequence_number,
                        source,
                    },
                });
                return;
            }

            if let Err(err) = reservation.advance(raw.sequence_number) {
                warn!(listener_id, sequence = raw.sequence_number, error = %err,
                    "cursor advance failed after a successful application");
                summary.failures.push(ListenerFailure {
                    listener_id: listener_id.to_string(),
                    error: err.into(),
                });
                return;
            }
            summary.events_applied += 1;
            debug!(listener_id, sequence = raw.sequence_number, "event applied");
        }
    }
}
