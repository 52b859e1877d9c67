//! Command semantics for operating the engine.
//!
//! The binary surfaces (flag parsing, process wiring) live with the host
//! application; these functions carry the behavior they drive. Output
//! policy is expressed through `tracing` levels: failures are always
//! `error`, per-listener progress is `debug` (shown when the subscriber is
//! verbose), and the closing applied-count is `info` unless quiet.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::engine::{CatchUpEngine, PassSummary};
use crate::notify::Wakeup;

#[derive(Debug, Clone, Copy, Default)]
pub struct CatchUpOptions {
    pub verbose: bool,
    pub quiet: bool,
}

/// Run one catch-up pass and report what it did.
pub fn catch_up<E>(engine: &CatchUpEngine<E>, options: &CatchUpOptions) -> PassSummary {
    let summary = engine.run_once();
    report(&summary, options);
    summary
}

#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// How long to sleep between passes when no commit wakes the loop.
    pub lookup_interval: Duration,
    pub verbose: bool,
    pub quiet: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            lookup_interval: Duration::from_secs(10),
            verbose: false,
            quiet: false,
        }
    }
}

/// Run catch-up passes until `shutdown` is set.
///
/// Sleeps `lookup_interval` between passes; a raised [`Wakeup`] (installed
/// on the store as its commit notifier) cuts the sleep short so in-process
/// commits are picked up immediately. The shutdown flag is checked after
/// every pass and every wait, so stopping takes at most one interval.
pub fn watch<E>(
    engine: &CatchUpEngine<E>,
    options: &WatchOptions,
    wakeup: &Wakeup,
    shutdown: &AtomicBool,
) {
    info!(interval = ?options.lookup_interval, "watching for events");
    while !shutdown.load(Ordering::SeqCst) {
        let summary = engine.run_once();
        report(
            &summary,
            &CatchUpOptions {
                verbose: options.verbose,
                quiet: options.quiet,
            },
        );
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        if wakeup.wait(options.lookup_interval) {
            debug!("woken by a commit");
        }
    }
    info!("watch loop stopped");
}

fn report(summary: &PassSummary, options: &CatchUpOptions) {
    if options.verbose {
        debug!(
            applied = summary.events_applied,
            skipped = summary.listeners_skipped,
            failures = summary.failures.len(),
            "pass finished"
        );
    }
    if !options.quiet {
        info!(applied = summary.events_applied, "catch-up pass applied events");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_defaults_to_a_ten_second_interval() {
        let options = WatchOptions::default();
        assert_eq!(options.lookup_interval, Duration::from_secs(10));
        assert!(!options.verbose);
        assert!(!options.quiet);
    }
}
