//! `chronik-catchup` — drives asynchronous listeners forward over the event
//! store's sequence, one event at a time, with crash-safe resumption.
//!
//! Each listener owns a durable cursor (its highest applied sequence
//! number) in the applied-sequence log. A catch-up pass reserves the
//! cursor, fetches the next unseen matching event, dispatches it and
//! advances the cursor. Multiple worker processes may run passes
//! concurrently against the same store; the per-listener cursor lock is the
//! single point of mutual exclusion.
//!
//! Listener side effects and the cursor advance are **not** atomic: a crash
//! between them redelivers the event on the next pass. Listeners must be
//! idempotent with respect to redelivery of the same event.

pub mod applied_log;
pub mod command;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod in_memory_log;
pub mod listener;
pub mod notify;
pub mod postgres_log;
pub mod process_manager;
pub mod registry;


pub use applied_log::{AppliedSequenceLog, Reservation};
pub use command::{catch_up, watch, CatchUpOptions, WatchOptions};
pub use dispatcher::ListenerDispatcher;
pub use engine::{CatchUpEngine, ListenerFailure, PassSummary};
pub use error::{CatchUpError, RegistryError, TrackerError};
pub use in_memory_log::InMemoryAppliedLog;
pub use listener::EventListener;
pub use notify::Wakeup;
pub use postgres_log::PostgresAppliedLog;
pub use process_manager::{ProcessManager, ProcessManagerDef};
pub use registry::{ListenerKind, ListenerRegistry, ListenerRegistryBuilder, Registration};
