//! Public commit/load façade over a storage backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;
use uuid::Uuid;

use chronik_core::{ExpectedVersion, StreamName};

use crate::codec::EventCodec;
use crate::error::{EventStoreError, EventStoreResult};
use crate::event::{DecoratedEvent, RawEvent, WritableEvent};
use crate::filter::EventFilter;
use crate::storage::{EventStorage, StorageStatus};
use crate::stream::EventStream;

/// Notified after a successful commit that new events exist.
///
/// The catch-up subsystem uses this to shortcut its polling interval.
/// Notification is best-effort and happens after the durable append.
pub trait CommitNotifier: Send + Sync {
    fn committed(&self, stream: &StreamName, events: &[RawEvent]);
}

/// Callback invoked after events have been committed (and the notifier
/// informed), with the original domain events and the persisted raw events.
pub type PostCommitCallback<E> = Box<dyn Fn(&[E], &[RawEvent]) + Send + Sync>;

/// Main API to store and fetch events.
///
/// Normalizes domain events into storable envelopes at commit time and
/// delegates storage to the backend. Generic over the application's domain
/// event type `E` via the codec seam.
pub struct EventStore<E> {
    storage: Arc<dyn EventStorage>,
    codec: Arc<dyn EventCodec<Event = E>>,
    notifier: Option<Arc<dyn CommitNotifier>>,
    /// Whether the notifier is invoked after commits. Disabled e.g. during
    /// bulk imports.
    notify_enabled: AtomicBool,
    post_commit: RwLock<Vec<PostCommitCallback<E>>>,
}

impl<E> EventStore<E> {
    pub fn new(storage: Arc<dyn EventStorage>, codec: Arc<dyn EventCodec<Event = E>>) -> Self {
        Self {
            storage,
            codec,
            notifier: None,
            notify_enabled: AtomicBool::new(true),
            post_commit: RwLock::new(Vec::new()),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn CommitNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Enable or disable post-commit notification of the catch-up
    /// subsystem. Enabled by default.
    pub fn set_notify_enabled(&self, enabled: bool) {
        self.notify_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Register a callback invoked after events have been committed, with
    /// the original domain events and the persisted raw events.
    pub fn on_post_commit(&self, callback: PostCommitCallback<E>) {
        if let Ok(mut callbacks) = self.post_commit.write() {
            callbacks.push(callback);
        }
    }

    /// Commit domain events to a stream under an expected version.
    ///
    /// No-op on an empty batch. Each event's type tag is resolved and its
    /// payload serialized through the codec; decorated events keep their
    /// identifier/metadata, plain ones get a fresh identifier and empty
    /// metadata. Fails with [`EventStoreError::Concurrency`] when the
    /// stream's actual version does not match `expected_version`.
    pub fn commit(
        &self,
        stream: &StreamName,
        events: Vec<DecoratedEvent<E>>,
        expected_version: ExpectedVersion,
    ) -> EventStoreResult<Vec<RawEvent>> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let mut domain_events = Vec::with_capacity(events.len());
        let mut writable = Vec::with_capacity(events.len());
        for decorated in events {
            let (event, identifier, metadata) = decorated.into_parts();
            let event_type = self.codec.resolve_type(&event)?;
            let payload = self.codec.serialize(&event)?;
            writable.push(WritableEvent {
                event_id: identifier.unwrap_or_else(Uuid::new_v4),
                event_type,
                payload,
                metadata,
            });
            domain_events.push(event);
        }

        let committed = self.storage.commit(stream, writable, expected_version)?;
        debug!(stream = %stream, count = committed.len(), "committed events");

        if self.notify_enabled.load(Ordering::SeqCst) {
            if let Some(notifier) = &self.notifier {
                notifier.committed(stream, &committed);
            }
        }

        if let Ok(callbacks) = self.post_commit.read() {
            for callback in callbacks.iter() {
                callback(&domain_events, &committed);
            }
        }

        Ok(committed)
    }

    /// Load a lazy stream of decoded events matching the filter.
    ///
    /// An empty result is an error only for stream-name-exact filters
    /// ([`EventStoreError::StreamNotFound`]); other filter variants return
    /// a valid empty stream.
    pub fn load(&self, filter: &EventFilter) -> EventStoreResult<EventStream<E>> {
        let raw = self.storage.load(filter)?;
        if raw.is_empty() {
            if let EventFilter::StreamName { stream } = filter {
                return Err(EventStoreError::StreamNotFound(stream.to_string()));
            }
        }
        Ok(EventStream::new(raw, Arc::clone(&self.codec)))
    }

    /// Earliest event matching the filter, decoded, if any.
    pub fn first(&self, filter: &EventFilter) -> EventStoreResult<Option<(E, RawEvent)>> {
        match self.storage.load_first(filter)? {
            Some(raw) => {
                let event = self.codec.decode(&raw.event_type, &raw.payload)?;
                Ok(Some((event, raw)))
            }
            None => Ok(None),
        }
    }

    /// Connectivity status of the backend (pure delegation).
    pub fn status(&self) -> EventStoreResult<StorageStatus> {
        self.storage.status()
    }

    /// Provision the backend's schema (pure delegation, idempotent).
    pub fn setup(&self) -> EventStoreResult<()> {
        self.storage.setup()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::in_memory::InMemoryEventStorage;
    use serde_json::{json, Value as JsonValue};
    use std::sync::atomic::AtomicUsize;

    fn store() -> EventStore<JsonValue> {
        EventStore::new(
            Arc::new(InMemoryEventStorage::new()),
            Arc::new(JsonCodec::new()),
        )
    }

    fn stream(name: &str) -> StreamName {
        StreamName::new(name).unwrap()
    }

    fn event(event_type: &str) -> DecoratedEvent<JsonValue> {
        DecoratedEvent::new(json!({ "event_type": event_type }))
    }

    #[test]
    fn empty_commit_is_a_no_op() {
        let store = store();
        let committed = store
            .commit(&stream("orders-1"), vec![], ExpectedVersion::NoStream)
            .unwrap();
        assert!(committed.is_empty());
        // The stream still does not exist.
        assert!(matches!(
            store.load(&EventFilter::stream(stream("orders-1"))),
            Err(EventStoreError::StreamNotFound(_))
        ));
    }

    #[test]
    fn plain_events_get_generated_identifiers_and_empty_metadata() {
        let store = store();
        let committed = store
            .commit(
                &stream("orders-1"),
                vec![event("OrderPlaced")],
                ExpectedVersion::NoStream,
            )
            .unwrap();
        assert!(committed[0].metadata.is_empty());
        assert_eq!(committed[0].event_type, "OrderPlaced");
    }

    #[test]
    fn decorated_events_keep_identifier_and_metadata() {
        let store = store();
        let id = Uuid::new_v4();
        let committed = store
            .commit(
                &stream("orders-1"),
                vec![event("OrderPlaced")
                    .with_identifier(id)
                    .with_correlation_id("C1")],
                ExpectedVersion::NoStream,
            )
            .unwrap();
        assert_eq!(committed[0].event_id, id);
        assert_eq!(committed[0].correlation_id(), Some("C1"));
    }

    #[test]
    fn stream_not_found_is_reserved_for_stream_exact_queries() {
        let store = store();
        assert!(matches!(
            store.load(&EventFilter::stream(stream("missing"))),
            Err(EventStoreError::StreamNotFound(_))
        ));

        // Empty-by-filter is a valid result for catch-up style queries.
        let empty = store
            .load(&EventFilter::event_types(["OrderPlaced"], 1).unwrap())
            .unwrap();
        assert_eq!(empty.remaining(), 0);
    }

    #[test]
    fn load_decodes_events_in_sequence_order() {
        let store = store();
        store
            .commit(
                &stream("orders-1"),
                vec![event("OrderPlaced"), event("OrderShipped")],
                ExpectedVersion::NoStream,
            )
            .unwrap();

        let loaded: Vec<_> = store
            .load(&EventFilter::stream(stream("orders-1")))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].1.sequence_number, 1);
        assert_eq!(loaded[1].1.event_type, "OrderShipped");
    }

    #[test]
    fn post_commit_callbacks_receive_domain_and_raw_events() {
        let store = store();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_cb = Arc::clone(&calls);
        store.on_post_commit(Box::new(move |events, raw| {
            assert_eq!(events.len(), raw.len());
            calls_in_cb.fetch_add(events.len(), Ordering::SeqCst);
        }));

        store
            .commit(
                &stream("orders-1"),
                vec![event("OrderPlaced"), event("OrderShipped")],
                ExpectedVersion::NoStream,
            )
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn notifier_is_gated_by_the_enable_flag() {
        struct CountingNotifier(AtomicUsize);
        impl CommitNotifier for CountingNotifier {
            fn committed(&self, _stream: &StreamName, events: &[RawEvent]) {
                self.0.fetch_add(events.len(), Ordering::SeqCst);
            }
        }

        let notifier = Arc::new(CountingNotifier(AtomicUsize::new(0)));
        let store = EventStore::new(
            Arc::new(InMemoryEventStorage::new()),
            Arc::new(JsonCodec::new()),
        )
        .with_notifier(notifier.clone());

        store
            .commit(
                &stream("orders-1"),
                vec![event("OrderPlaced")],
                ExpectedVersion::NoStream,
            )
            .unwrap();
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);

        // Bulk-import mode: notification suppressed.
        store.set_notify_enabled(false);
        store
            .commit(
                &stream("orders-1"),
                vec![event("OrderShipped")],
                ExpectedVersion::Exact(1),
            )
            .unwrap();
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
    }
}
