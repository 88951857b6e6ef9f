//! Wall clock and the shared liveness predicate.
//!
//! Every staleness decision (listing, join-by-code, status, bind, forwarding
//! and the sweeps) goes through [`Ttl::is_live`].

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current time in Unix milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Maximum silence before an entry is considered dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ttl {
    window_ms: u64,
}

impl Ttl {
    /// TTL of `window_ms` milliseconds.
    pub fn from_millis(window_ms: u64) -> Self {
        Self { window_ms }
    }

    /// The window in milliseconds.
    pub fn as_millis(&self) -> u64 {
        self.window_ms
    }

    /// The window as a [`Duration`].
    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Whether an entry last refreshed at `last_ms` is alive at `now_ms`.
    ///
    /// The boundary is inclusive. A refresh stamped after `now_ms` counts as
    /// live.
    pub fn is_live(&self, last_ms: u64, now_ms: u64) -> bool {
        now_ms.saturating_sub(last_ms) <= self.window_ms
    }
}
