//! `chronik-store` — append-only event store with filter-based queries.
//!
//! Events are committed to named streams under optimistic concurrency and
//! assigned two positions: a per-stream `version` (gap-free from 1) and a
//! store-wide `sequence_number` (monotonic across all streams). Reads go
//! through [`EventFilter`]s which storage backends translate into query
//! plans.

pub mod codec;
pub mod error;
pub mod event;
pub mod filter;
pub mod in_memory;
pub mod postgres;
pub mod storage;
pub mod store;
pub mod stream;

pub use codec::{EventCodec, JsonCodec};
pub use error::{EventStoreError, EventStoreResult};
pub use event::{DecoratedEvent, RawEvent, WritableEvent, CORRELATION_ID};
pub use filter::EventFilter;
pub use in_memory::InMemoryEventStorage;
pub use postgres::PostgresEventStorage;
pub use storage::{EventStorage, StorageStatus};
pub use store::{CommitNotifier, EventStore};
pub use stream::EventStream;
