//! Query descriptors selecting a subset of the event sequence.
//!
//! Filters are immutable value objects; storage backends are responsible
//! for translating them into an actual query plan.

use serde::{Deserialize, Serialize};

use chronik_core::StreamName;

use crate::error::{EventStoreError, EventStoreResult};
use crate::event::RawEvent;

/// Selects a subset (and implicitly an ordering: ascending sequence number)
/// of the event sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventFilter {
    /// Exact stream match.
    StreamName { stream: StreamName },
    /// Event type ∈ the given set, sequence number ≥ the given minimum.
    EventTypes {
        event_types: Vec<String>,
        min_sequence: u64,
    },
    /// Metadata correlation id equals the given value, sequence number ≤
    /// the given maximum.
    Correlation {
        correlation_id: String,
        max_sequence: u64,
    },
}

impl EventFilter {
    pub fn stream(stream: StreamName) -> Self {
        EventFilter::StreamName { stream }
    }

    /// Filter by event type set and minimum sequence number.
    ///
    /// Fails with [`EventStoreError::InvalidFilter`] if the set is empty or
    /// any type is empty after trimming.
    pub fn event_types(
        event_types: impl IntoIterator<Item = impl Into<String>>,
        min_sequence: u64,
    ) -> EventStoreResult<Self> {
        let mut types = Vec::new();
        for event_type in event_types {
            let event_type = event_type.into();
            let trimmed = event_type.trim();
            if trimmed.is_empty() {
                return Err(EventStoreError::InvalidFilter(
                    "empty event type provided".to_string(),
                ));
            }
            types.push(trimmed.to_string());
        }
        if types.is_empty() {
            return Err(EventStoreError::InvalidFilter(
                "no event types provided".to_string(),
            ));
        }
        Ok(EventFilter::EventTypes {
            event_types: types,
            min_sequence,
        })
    }

    /// Filter by correlation identifier and maximum sequence number.
    ///
    /// Fails with [`EventStoreError::InvalidFilter`] if the correlation id
    /// is empty after trimming.
    pub fn correlation(
        correlation_id: impl Into<String>,
        max_sequence: u64,
    ) -> EventStoreResult<Self> {
        let correlation_id = correlation_id.into();
        let trimmed = correlation_id.trim();
        if trimmed.is_empty() {
            return Err(EventStoreError::InvalidFilter(
                "empty correlation identifier provided".to_string(),
            ));
        }
        Ok(EventFilter::Correlation {
            correlation_id: trimmed.to_string(),
            max_sequence,
        })
    }

    /// Whether this filter targets one specific named stream.
    ///
    /// Only such queries distinguish "no such stream" from "empty but
    /// valid" results.
    pub fn is_stream_exact(&self) -> bool {
        matches!(self, EventFilter::StreamName { .. })
    }

    /// Predicate form of the filter, used by the in-memory backend.
    pub fn matches(&self, event: &RawEvent) -> bool {
        match self {
            EventFilter::StreamName { stream } => event.stream == *stream,
            EventFilter::EventTypes {
                event_types,
                min_sequence,
            } => {
                event.sequence_number >= *min_sequence
                    && event_types.iter().any(|t| *t == event.event_type)
            }
            EventFilter::Correlation {
                correlation_id,
                max_sequence,
            } => {
                event.sequence_number <= *max_sequence
                    && event.correlation_id() == Some(correlation_id.as_str())
            }
        }
    }
}
