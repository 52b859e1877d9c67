//! Lazy event stream returned by `load`.

use std::sync::Arc;

use crate::codec::EventCodec;
use crate::error::EventStoreResult;
use crate::event::RawEvent;

/// A forward-only, finite sequence of decoded `(event, raw event)` pairs in
/// ascending sequence number order.
///
/// Produced by one `load` call against a snapshot of the store at query
/// time. Payloads are decoded lazily as the stream is advanced. Not
/// restartable; resuming requires a new `load` with an advanced filter.
pub struct EventStream<E> {
    raw: std::vec::IntoIter<RawEvent>,
    codec: Arc<dyn EventCodec<Event = E>>,
}

impl<E> EventStream<E> {
    pub(crate) fn new(raw: Vec<RawEvent>, codec: Arc<dyn EventCodec<Event = E>>) -> Self {
        Self {
            raw: raw.into_iter(),
            codec,
        }
    }

    /// Events remaining in the stream.
    pub fn remaining(&self) -> usize {
        self.raw.len()
    }
}

impl<E> Iterator for EventStream<E> {
    type Item = EventStoreResult<(E, RawEvent)>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.raw.next()?;
        Some(
            self.codec
                .decode(&raw.event_type, &raw.payload)
                .map(|event| (event, raw)),
        )
    }
}
