//! Commit wake-up signal for the watch loop.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

use chronik_core::StreamName;
use chronik_store::{CommitNotifier, RawEvent};

/// A latching signal: commits set it, the watch loop consumes it.
///
/// Installed on the store as its [`CommitNotifier`] so a watch loop sharing
/// the process with writers reacts immediately instead of sleeping out its
/// full lookup interval. Missed-wakeup safe: a signal raised before the
/// wait starts is still observed.
#[derive(Debug, Default)]
pub struct Wakeup {
    raised: Mutex<bool>,
    condvar: Condvar,
}

impl Wakeup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        if let Ok(mut raised) = self.raised.lock() {
            *raised = true;
        }
        self.condvar.notify_all();
    }

    /// Block until the signal is raised or the timeout elapses, consuming
    /// the signal. Returns `true` when woken by a raise.
    pub fn wait(&self, timeout: Duration) -> bool {
        let Ok(mut raised) = self.raised.lock() else {
            return false;
        };
        if !*raised {
            let Ok((guard, _)) = self.condvar.wait_timeout_while(raised, timeout, |r| !*r) else {
                return false;
            };
            raised = guard;
        }
        let woken = *raised;
        *raised = false;
        woken
    }
}

impl CommitNotifier for Wakeup {
    fn committed(&self, _stream: &StreamName, _events: &[RawEvent]) {
        self.raise();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn a_raise_before_the_wait_is_not_lost() {
        let wakeup = Wakeup::new();
        wakeup.raise();
        assert!(wakeup.wait(Duration::from_millis(1)));
        // Consumed: the next wait times out.
        assert!(!wakeup.wait(Duration::from_millis(1)));
    }

    #[test]
    fn a_raise_interrupts_a_pending_wait() {
        let wakeup = Arc::new(Wakeup::new());
        let waiter = Arc::clone(&wakeup);
        let handle = thread::spawn(move || waiter.wait(Duration::from_secs(5)));
        thread::sleep(Duration::from_millis(20));
        wakeup.raise();
        assert!(handle.join().unwrap());
    }
}
