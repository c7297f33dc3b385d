//! Wall-clock budget for a search session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

/// Count-down that bounds how long a search session may keep paginating.
///
/// The timer is a deadline, not a thread: [`SearchTimer::is_running`] checks
/// the elapsed time each time it is called and flips the running flag once
/// the timeout has passed. Clones share the flag, so a clone handed to an
/// interrupt handler can [`stop`](SearchTimer::stop) the session. Once the
/// flag is false it stays false.
#[derive(Debug, Clone)]
pub struct SearchTimer {
    running: Arc<AtomicBool>,
    start: Instant,
    timeout: Duration,
}

impl SearchTimer {
    /// Starts a timer that expires after `timeout`.
    pub fn start(timeout: Duration) -> Self {
        debug!("Search timer started ({:?})", timeout);
        Self {
            running: Arc::new(AtomicBool::new(true)),
            start: Instant::now(),
            timeout,
        }
    }

    /// Returns whether the session may continue.
    pub fn is_running(&self) -> bool {
        if !self.running.load(Ordering::Acquire) {
            return false;
        }
        if self.start.elapsed() >= self.timeout {
            self.stop();
            return false;
        }
        true
    }

    /// Stops the timer early. Calling it more than once is harmless.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            debug!("Search timer stopped after {:?}", self.start.elapsed());
        }
    }

    /// Time since the timer was started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time left before expiry, zero once expired or stopped.
    pub fn remaining(&self) -> Duration {
        if !self.running.load(Ordering::Acquire) {
            return Duration::ZERO;
        }
        self.timeout.saturating_sub(self.start.elapsed())
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
