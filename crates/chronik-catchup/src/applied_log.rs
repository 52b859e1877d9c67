//! Per-listener durable cursor with a reserve/advance/release protocol.

use crate::error::TrackerError;

/// Durable record of each listener's highest applied sequence number.
///
/// A cursor starts at 0 ("nothing applied yet") and is created lazily on
/// first reservation. At most one live reservation exists per listener at
/// any time, across all worker processes; this lock is the only mutual
/// exclusion in the catch-up path.
pub trait AppliedSequenceLog: Send + Sync {
    /// Reserve a listener's cursor: acquire its lock (waiting up to a
    /// bounded timeout) and read the current value under that lock.
    ///
    /// Fails with [`TrackerError::ReservationUnavailable`] when the lock is
    /// held elsewhere; callers treat that as "try again later".
    fn reserve(&self, listener_id: &str) -> Result<Box<dyn Reservation>, TrackerError>;
}

/// A held cursor lock.
///
/// Dropping a reservation without advancing releases the lock without
/// mutating the stored value, like a transaction rollback, so the next
/// reservation sees the unchanged cursor.
pub trait Reservation: Send {
    /// Cursor value read under the lock.
    fn highest_applied(&self) -> u64;

    /// Persist a new cursor value and release the lock.
    ///
    /// `sequence` must not be below the reserved value; the stored cursor
    /// only ever increases.
    fn advance(self: Box<Self>, sequence: u64) -> Result<(), TrackerError>;
}
