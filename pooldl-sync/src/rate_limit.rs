//! One-request-per-second pacing for API calls.
//!
//! Courtesy throttle, not a retry mechanism: if the previous API call
//! finished within the current wall-clock second, the next one waits a full
//! second first. File downloads are never paced.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

const PACING_DELAY: Duration = Duration::from_secs(1);

/// Source of wall-clock seconds plus the ability to wait.
pub trait Clock {
    /// Whole seconds since the Unix epoch.
    fn now_secs(&self) -> u64;
    fn sleep(&mut self, duration: Duration);
}

/// The real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Last-request bookkeeping shared by every API call of a run.
#[derive(Debug)]
pub struct RateLimiter<C: Clock = SystemClock> {
    clock: C,
    last_request: Option<u64>,
}

impl Default for RateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            last_request: None,
        }
    }

    /// Block until an API call may be issued.
    ///
    /// Returns `true` if it had to wait.
    pub fn pace(&mut self) -> bool {
        match self.last_request {
            Some(last) if last == self.clock.now_secs() => {
                tracing::debug!("rate limit: waiting {:?} before next API call", PACING_DELAY);
                self.clock.sleep(PACING_DELAY);
                true
            }
            _ => false,
        }
    }

    /// Note that an API call just completed.
    pub fn record(&mut self) {
        self.last_request = Some(self.clock.now_secs());
    }

    pub fn last_request(&self) -> Option<u64> {
        self.last_request
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
