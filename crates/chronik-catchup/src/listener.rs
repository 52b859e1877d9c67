//! Listener contract for catch-up delivery.

use chronik_store::RawEvent;

/// A listener that is caught up asynchronously over the store's sequence.
///
/// Events are delivered strictly in sequence order, one at a time. Because
/// side effects and the cursor advance are not atomic, the same event may be
/// redelivered after a crash or a failed pass; implementations must be
/// idempotent with respect to redelivery.
///
/// An error from [`apply`](Self::apply) leaves the cursor untouched so the
/// same event is retried on the next pass.
pub trait EventListener<E>: Send + Sync {
    /// Invoked before the handler, once per delivery.
    fn before_apply(&self, _event: &E, _raw: &RawEvent) {}

    /// Handle one event.
    fn apply(&self, event: &E, raw: &RawEvent) -> anyhow::Result<()>;

    /// Invoked after a successful handler invocation.
    fn after_apply(&self, _event: &E, _raw: &RawEvent) {}
}
