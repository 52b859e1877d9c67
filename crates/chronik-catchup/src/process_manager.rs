//! Process managers: stateful policies rebuilt from their correlated
//! history on every invocation.
//!
//! A process manager never holds state between deliveries. The dispatcher
//! reconstitutes a fresh instance from all earlier events sharing the
//! triggering event's correlation id, folds them oldest-first (discarding
//! whatever the fold returns), then applies the triggering event and
//! publishes the events that application recorded.

use chronik_core::StreamName;
use chronik_store::RawEvent;

/// One transient instance of a process manager.
///
/// [`when`](Self::when) both folds history and reacts to new events: it
/// mutates internal state and returns the events recorded by that step. The
/// dispatcher discards the return value while replaying history, so
/// reacting in `when` is safe even for already-processed events, but the
/// reaction must be a pure function of state + event (no external side
/// effects during replay — perform those in the events you record instead).
pub trait ProcessManager<E>: Send {
    fn when(&mut self, event: &E, raw: &RawEvent) -> anyhow::Result<Vec<E>>;
}

/// Factory and routing for one process-manager kind.
pub trait ProcessManagerDef<E>: Send + Sync {
    /// Create a fresh, empty instance for the given correlation id.
    fn create(&self, correlation_id: &str) -> Box<dyn ProcessManager<E>>;

    /// The stream the manager's recorded events are published to.
    fn stream_name(&self, correlation_id: &str) -> StreamName;
}
