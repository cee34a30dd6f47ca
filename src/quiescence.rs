//! Post-reboot quiescence
//!
//! After a command that restarts the router, nothing may be sent until the
//! configured window has passed. Once it has, the old session cookie is dead
//! and a fresh login is required.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuiescenceStatus {
    /// No reboot pending
    Clear,
    Active { remaining: Duration },
    /// Window just ended; caller must invalidate the session
    Elapsed,
}

#[derive(Debug, Clone)]
pub struct QuiescencePolicy {
    interval: Duration,
    until: Option<Instant>,
}

impl QuiescencePolicy {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            until: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the window after a reboot-inducing command succeeded
    pub fn arm(&mut self, now: Instant) {
        self.until = Some(now + self.interval);
    }

    /// Reports `Elapsed` exactly once per armed window
    pub fn check(&mut self, now: Instant) -> QuiescenceStatus {
        match self.until {
            None => QuiescenceStatus::Clear,
            Some(until) if now < until => QuiescenceStatus::Active {
                remaining: until - now,
            },
            Some(_) => {
                self.until = None;
                QuiescenceStatus::Elapsed
            }
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.until
    }
}
