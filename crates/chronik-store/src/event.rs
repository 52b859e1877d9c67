//! Event envelopes: the pre-commit and post-commit representations of a
//! domain event, decoupled from any particular payload type.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use chronik_core::StreamName;

/// Metadata key carrying the correlation identifier that links events of one
/// logical business process (and routes them to process managers).
pub const CORRELATION_ID: &str = "correlation_id";

/// An event ready to be committed to a stream (no positions assigned yet).
///
/// Built by the [`EventStore`](crate::store::EventStore) at commit time from
/// a domain event: the payload is serialized through the codec and the
/// envelope carries an identifier (caller-supplied or freshly generated) and
/// string-keyed metadata. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritableEvent {
    /// Globally unique event identifier.
    pub event_id: Uuid,
    /// Stable event type tag (resolved by the codec).
    pub event_type: String,
    /// Serialized payload.
    pub payload: JsonValue,
    /// String-keyed metadata; may carry [`CORRELATION_ID`].
    pub metadata: BTreeMap<String, String>,
}

/// A committed event: a [`WritableEvent`] plus the positions the storage
/// backend assigned at commit time.
///
/// `version` is gap-free per stream starting at 1; `sequence_number` is
/// unique and monotonic across the whole store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub event_id: Uuid,
    pub stream: StreamName,
    pub event_type: String,
    pub payload: JsonValue,
    pub metadata: BTreeMap<String, String>,
    /// Store-wide position, assigned at commit.
    pub sequence_number: u64,
    /// Per-stream position, assigned at commit.
    pub version: u64,
    pub recorded_at: DateTime<Utc>,
}

impl RawEvent {
    /// Correlation identifier carried in the metadata, if any.
    pub fn correlation_id(&self) -> Option<&str> {
        self.metadata.get(CORRELATION_ID).map(String::as_str)
    }
}

/// A domain event decorated with an explicit identifier and/or metadata.
///
/// Plain events get a generated identifier and empty metadata at commit
/// time; wrap them in a `DecoratedEvent` to control either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedEvent<E> {
    event: E,
    identifier: Option<Uuid>,
    metadata: BTreeMap<String, String>,
}

impl<E> DecoratedEvent<E> {
    pub fn new(event: E) -> Self {
        Self {
            event,
            identifier: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: Uuid) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_correlation_id(self, correlation_id: impl Into<String>) -> Self {
        self.with_metadata(CORRELATION_ID, correlation_id)
    }

    pub fn event(&self) -> &E {
        &self.event
    }

    pub fn identifier(&self) -> Option<Uuid> {
        self.identifier
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub(crate) fn into_parts(self) -> (E, Option<Uuid>, BTreeMap<String, String>) {
        (self.event, self.identifier, self.metadata)
    }
}

impl<E> From<E> for DecoratedEvent<E> {
    fn from(event: E) -> Self {
        Self::new(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decorated_event_carries_correlation_metadata() {
        let decorated = DecoratedEvent::new("payload").with_correlation_id("C1");
        assert_eq!(
            decorated.metadata().get(CORRELATION_ID).map(String::as_str),
            Some("C1")
        );
        assert!(decorated.identifier().is_none());
    }
}
