//! `chronik-core` — value types shared across the event store and catch-up
//! machinery.
//!
//! This crate contains **pure** primitives (no storage concerns).

pub mod error;
pub mod stream;
pub mod version;

pub use error::{CoreError, CoreResult};
pub use stream::StreamName;
pub use version::ExpectedVersion;
