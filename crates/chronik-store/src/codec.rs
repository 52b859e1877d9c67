//! Type/codec seam between domain events and their stored representation.

use serde_json::Value as JsonValue;

use crate::error::{EventStoreError, EventStoreResult};

/// Resolves type tags and converts between a domain event type `Event` and
/// the opaque serialized payload the storage backend persists.
///
/// Implementations typically match on an application event enum and use
/// serde for the payload.
pub trait EventCodec: Send + Sync {
    /// Domain event type this codec handles.
    type Event;

    /// Stable type tag for an event (e.g. `"OrderPlaced"`).
    fn resolve_type(&self, event: &Self::Event) -> EventStoreResult<String>;

    /// Serialize an event's payload.
    fn serialize(&self, event: &Self::Event) -> EventStoreResult<JsonValue>;

    /// Decode a payload back into a domain event.
    fn decode(&self, event_type: &str, payload: &JsonValue) -> EventStoreResult<Self::Event>;
}

/// Passthrough codec for untyped wiring: events are JSON objects carrying
/// their own type tag in an `event_type` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Field of the JSON object holding the event type tag.
    pub const TYPE_FIELD: &'static str = "event_type";

    pub fn new() -> Self {
        Self
    }
}

impl EventCodec for JsonCodec {
    type Event = JsonValue;

    fn resolve_type(&self, event: &JsonValue) -> EventStoreResult<String> {
        event
            .get(Self::TYPE_FIELD)
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                EventStoreError::Codec(format!(
                    "JSON event is missing a string \"{}\" field",
                    Self::TYPE_FIELD
                ))
            })
    }

    fn serialize(&self, event: &JsonValue) -> EventStoreResult<JsonValue> {
        Ok(event.clone())
    }

    fn decode(&self, _event_type: &str, payload: &JsonValue) -> EventStoreResult<JsonValue> {
        Ok(payload.clone())
    }
}
