//! In-memory storage backend.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use chronik_core::{ExpectedVersion, StreamName};

use crate::error::{EventStoreError, EventStoreResult};
use crate::event::{RawEvent, WritableEvent};
use crate::filter::EventFilter;
use crate::storage::{EventStorage, StorageStatus};

#[derive(Debug, Default)]
struct Log {
    /// Global log in commit order; index + 1 == sequence number.
    events: Vec<RawEvent>,
    /// Current version per stream (0 = stream absent).
    stream_versions: HashMap<StreamName, u64>,
}

/// In-memory append-only event storage.
///
/// Intended for tests/dev. Sequence numbers are gap-free from 1 in commit
/// order; versions are gap-free from 1 per stream.
#[derive(Debug, Default)]
pub struct InMemoryEventStorage {
    log: RwLock<Log>,
}

impl InMemoryEventStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events in the store (test helper).
    pub fn len(&self) -> usize {
        self.log.read().map(|log| log.events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventStorage for InMemoryEventStorage {
    fn load(&self, filter: &EventFilter) -> EventStoreResult<Vec<RawEvent>> {
        let log = self
            .log
            .read()
            .map_err(|_| EventStoreError::Storage("lock poisoned".to_string()))?;
        Ok(log
            .events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    fn load_first(&self, filter: &EventFilter) -> EventStoreResult<Option<RawEvent>> {
        let log = self
            .log
            .read()
            .map_err(|_| EventStoreError::Storage("lock poisoned".to_string()))?;
        Ok(log.events.iter().find(|e| filter.matches(e)).cloned())
    }

    fn commit(
        &self,
        stream: &StreamName,
        events: Vec<WritableEvent>,
        expected_version: ExpectedVersion,
    ) -> EventStoreResult<Vec<RawEvent>> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let mut log = self
            .log
            .write()
            .map_err(|_| EventStoreError::Storage("lock poisoned".to_string()))?;

        let current = log.stream_versions.get(stream).copied().unwrap_or(0);
        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "stream \"{stream}\": expected {expected_version:?}, found {current}"
            )));
        }

        let mut next_version = current + 1;
        let mut next_sequence = log.events.len() as u64 + 1;
        let mut committed = Vec::with_capacity(events.len());
        for event in events {
            let raw = RawEvent {
                event_id: event.event_id,
                stream: stream.clone(),
                event_type: event.event_type,
                payload: event.payload,
                metadata: event.metadata,
                sequence_number: next_sequence,
                version: next_version,
                recorded_at: Utc::now(),
            };
            next_version += 1;
            next_sequence += 1;
            log.events.push(raw.clone());
            committed.push(raw);
        }
        log.stream_versions
            .insert(stream.clone(), next_version - 1);

        Ok(committed)
    }

    fn status(&self) -> EventStoreResult<StorageStatus> {
        Ok(StorageStatus {
            backend: "in-memory".to_string(),
            reachable: true,
            detail: None,
        })
    }

    fn setup(&self) -> EventStoreResult<()> {
        Ok(())
    }
}
