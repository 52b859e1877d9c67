//! Storage backend boundary.
//!
//! A backend is a durable append-only log. It assigns versions and sequence
//! numbers at commit time and translates [`EventFilter`]s into queries, but
//! knows nothing about domain events or codecs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use chronik_core::{ExpectedVersion, StreamName};

use crate::error::EventStoreResult;
use crate::event::{RawEvent, WritableEvent};
use crate::filter::EventFilter;

/// Connectivity/provisioning status reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStatus {
    /// Backend identifier (e.g. `"postgres"`, `"in-memory"`).
    pub backend: String,
    pub reachable: bool,
    pub detail: Option<String>,
}

/// Durable append-only event log.
///
/// Implementations must:
/// - keep `version` gap-free per stream starting at 1
/// - keep `sequence_number` unique and monotonic across the whole store
/// - enforce the optimistic concurrency check atomically with the append
/// - return loaded events in ascending sequence number order
pub trait EventStorage: Send + Sync {
    /// Load all events matching the filter, ordered by ascending sequence
    /// number. An empty result is not an error at this layer.
    fn load(&self, filter: &EventFilter) -> EventStoreResult<Vec<RawEvent>>;

    /// Load the earliest event matching the filter, if any.
    fn load_first(&self, filter: &EventFilter) -> EventStoreResult<Option<RawEvent>>;

    /// Atomically append a batch to a stream under an expected version.
    ///
    /// Fails with [`EventStoreError::Concurrency`](crate::EventStoreError::Concurrency)
    /// when the stream's actual version does not match, leaving the store
    /// unchanged.
    fn commit(
        &self,
        stream: &StreamName,
        events: Vec<WritableEvent>,
        expected_version: ExpectedVersion,
    ) -> EventStoreResult<Vec<RawEvent>>;

    /// Connectivity check.
    fn status(&self) -> EventStoreResult<StorageStatus>;

    /// Provision the backend's schema (idempotent).
    fn setup(&self) -> EventStoreResult<()>;
}

impl<S> EventStorage for Arc<S>
where
    S: EventStorage + ?Sized,
{
    fn load(&self, filter: &EventFilter) -> EventStoreResult<Vec<RawEvent>> {
        (**self).load(filter)
    }

    fn load_first(&self, filter: &EventFilter) -> EventStoreResult<Option<RawEvent>> {
        (**self).load_first(filter)
    }

    fn commit(
        &self,
        stream: &StreamName,
        events: Vec<WritableEvent>,
        expected_version: ExpectedVersion,
    ) -> EventStoreResult<Vec<RawEvent>> {
        (**self).commit(stream, events, expected_version)
    }

    fn status(&self) -> EventStoreResult<StorageStatus> {
        (**self).status()
    }

    fn setup(&self) -> EventStoreResult<()> {
        (**self).setup()
    }
}
