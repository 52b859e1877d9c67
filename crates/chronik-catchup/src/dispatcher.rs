//! Delivers a single event to a registered listener.
//!
//! Plain listeners get the before/apply/after sequence. Process managers
//! are reconstituted from their correlated history first: every earlier
//! event sharing the triggering event's correlation id is folded into a
//! fresh instance (output discarded), then the triggering event is applied
//! and whatever it recorded is published to the manager's own stream,
//! stamped with the same correlation id. A failure anywhere before the
//! publish commits nothing.

use std::sync::Arc;

use anyhow::Context;
use chronik_core::ExpectedVersion;
use chronik_store::{DecoratedEvent, EventFilter, EventStore, RawEvent};
use tracing::debug;

use crate::process_manager::ProcessManagerDef;
use crate::registry::{ListenerKind, Registration};

pub struct ListenerDispatcher<E> {
    store: Arc<EventStore<E>>,
}

impl<E> ListenerDispatcher<E> {
    pub fn new(store: Arc<EventStore<E>>) -> Self {
        Self { store }
    }

    /// Deliver one event to one registration.
    ///
    /// Errors leave the listener's cursor untouched; the caller decides
    /// retry policy.
    pub fn dispatch(
        &self,
        registration: &Registration<E>,
        event: &E,
        raw: &RawEvent,
    ) -> anyhow::Result<()> {
        match &registration.kind {
            ListenerKind::Plain(listener) => {
                listener.before_apply(event, raw);
                listener.apply(event, raw)?;
                listener.after_apply(event, raw);
                Ok(())
            }
            ListenerKind::ProcessManager(def) => self.dispatch_to_manager(def.as_ref(), event, raw),
        }
    }

    fn dispatch_to_manager(
        &self,
        def: &dyn ProcessManagerDef<E>,
        event: &E,
        raw: &RawEvent,
    ) -> anyhow::Result<()> {
        let correlation_id = raw
            .correlation_id()
            .with_context(|| {
                format!(
                    "event \"{}\" ({}) carries no correlation identifier",
                    raw.event_type, raw.event_id
                )
            })?
            .to_string();

        let mut manager = def.create(&correlation_id);

        // Replay everything correlated that happened before this event.
        // Recorded output is discarded: history was already published.
        let mut replayed = 0u64;
        if raw.sequence_number > 1 {
            let history =
                EventFilter::correlation(correlation_id.clone(), raw.sequence_number - 1)?;
            for item in self.store.load(&history)? {
                let (past_event, past_raw) = item?;
                manager.when(&past_event, &past_raw)?;
                replayed += 1;
            }
        }
        debug!(
            correlation_id = %correlation_id,
            sequence = raw.sequence_number,
            replayed,
            "process manager reconstituted"
        );

        let recorded = manager.when(event, raw)?;
        if recorded.is_empty() {
            return Ok(());
        }

        let stream = def.stream_name(&correlation_id);
        let decorated = recorded
            .into_iter()
            .map(|e| DecoratedEvent::new(e).with_correlation_id(correlation_id.clone()))
            .collect();
        self.store
            .commit(&stream, decorated, ExpectedVersion::Any)
            .with_context(|| format!("publishing process-manager events to \"{stream}\""))?;
        Ok(())
    }
}
