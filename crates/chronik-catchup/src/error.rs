//! Catch-up error taxonomy.

use thiserror::Error;

use chronik_store::EventStoreError;

/// Applied-sequence log errors.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The listener's cursor lock could not be acquired within the wait
    /// bound. Transient: another worker is advancing this listener; try
    /// again on the next pass.
    #[error("cursor for listener \"{0}\" is locked by another reservation")]
    ReservationUnavailable(String),

    /// Advancing below the reserved cursor value was attempted. The stored
    /// cursor only ever increases.
    #[error("cursor regression: currently at {current}, requested {requested}")]
    CursorRegression { current: u64, requested: u64 },

    /// The underlying storage failed.
    #[error("tracker storage error: {0}")]
    Storage(String),
}

/// Listener registry construction errors (startup checks).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("listener identifier \"{0}\" is registered twice")]
    DuplicateListener(String),

    #[error("listener \"{0}\" consumes no event types")]
    NoEventTypes(String),

    #[error("listener \"{0}\" declares an empty event type")]
    EmptyEventType(String),
}

/// Failures surfaced by a catch-up pass.
///
/// Reservation contention and stream exhaustion are handled inside the
/// engine and never appear here.
#[derive(Debug, Error)]
pub enum CatchUpError {
    /// A listener's handler failed. The cursor was not advanced; the event
    /// is redelivered on the next pass and the listener makes no further
    /// progress until the failure is resolved.
    #[error("event \"{event_type}\" (sequence {sequence_number}) could not be applied to \"{listener_id}\": {source}")]
    ListenerApplicationFailed {
        listener_id: String,
        event_type: String,
        sequence_number: u64,
        #[source]
        source: anyhow::Error,
    },

    /// The event store failed while fetching or publishing.
    #[error(transparent)]
    Store(#[from] EventStoreError),

    /// The applied-sequence log failed outside of lock contention.
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}
