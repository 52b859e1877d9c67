//! Event store operation errors.

use thiserror::Error;

/// Result type used across the store crate.
pub type EventStoreResult<T> = Result<T, EventStoreError>;

/// Event store operation error.
///
/// These are infrastructure errors (storage, concurrency, queries) as
/// opposed to domain errors. `Concurrency` and `StreamNotFound` are part of
/// the commit/load contract; callers are expected to handle them.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Optimistic concurrency check failed; the store is unchanged.
    /// Callers must reload and retry, or surface the conflict.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// A stream-name-exact query matched no events. Queries through other
    /// filter variants return an empty stream instead.
    #[error("event stream \"{0}\" not found")]
    StreamNotFound(String),

    /// A filter was constructed from invalid arguments (programmer error).
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Payload serialization or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// The storage backend failed (connectivity, constraint, IO).
    #[error("storage error: {0}")]
    Storage(String),
}
