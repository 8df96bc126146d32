//! Fixed-interval reconnect bookkeeping.
//!
//! The attempt counter counts reconnects since the last successful open. It
//! is reset on open, incremented when a scheduled retry fires, and never
//! exceeds the configured ceiling. Reaching the ceiling marks the tracker
//! exhausted until the next successful open.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

/// What to do after a connection closes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Retry after `delay`; this will be reconnect number `attempt`.
    Retry {
        /// 1-based attempt number.
        attempt: u32,
        /// Wait before connecting.
        delay: Duration,
    },
    /// The ceiling was reached; stay closed.
    Exhausted {
        /// Attempts made since the last open.
        attempts: u32,
    },
}

/// Shared attempt counter plus the fixed retry policy.
#[derive(Debug)]
pub struct ReconnectTracker {
    max_attempts: u32,
    interval: Duration,
    attempts: AtomicU32,
    exhausted: AtomicBool,
}

impl ReconnectTracker {
    /// Tracker allowing `max_attempts` retries spaced `interval` apart.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            attempts: AtomicU32::new(0),
            exhausted: AtomicBool::new(false),
        }
    }

    /// Decide the next step after a close.
    pub fn on_close(&self) -> ReconnectDecision {
        let attempts = self.attempts.load(Ordering::SeqCst);
        if attempts < self.max_attempts {
            ReconnectDecision::Retry {
                attempt: attempts + 1,
                delay: self.interval,
            }
        } else {
            self.exhausted.store(true, Ordering::SeqCst);
            ReconnectDecision::Exhausted { attempts }
        }
    }

    /// A scheduled retry fired.
    pub fn record_attempt(&self) -> u32 {
        let prev = self
            .attempts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_attempts).then_some(n + 1)
            })
            .unwrap_or(self.max_attempts);
        (prev + 1).min(self.max_attempts)
    }

    /// The connection opened; start counting from zero again.
    pub fn reset(&self) {
        self.attempts.store(0, Ordering::SeqCst);
        self.exhausted.store(false, Ordering::SeqCst);
    }

    /// Reconnects made since the last open.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Whether the ceiling has been hit.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }
}
