//! Rate limiting for the allocating endpoints.
//!
//! `POST /world/open` and `POST /session/create` allocate server state, so
//! they are checked against a global per-second quota and a per-client-IP
//! per-minute quota. Both use governor; the keyed limiter is backed by DashMap.

use crate::config::LimitsConfig;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

/// Type alias for a keyed rate limiter using DashMap.
type KeyedLimiter<K> = RateLimiter<
    K,
    dashmap::DashMap<K, InMemoryState>,
    DefaultClock,
    NoOpMiddleware<governor::clock::QuantaInstant>,
>;

/// Type alias for a direct (non-keyed) rate limiter.
type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiters shared by a service's handlers.
#[derive(Clone)]
pub struct RateLimits {
    /// Limits requests per client IP.
    client_limiter: Arc<KeyedLimiter<IpAddr>>,
    /// Caps aggregate throughput even when every client is within its quota.
    global_limiter: Arc<DirectLimiter>,
}

impl std::fmt::Debug for RateLimits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimits")
            .field("client_limiter", &"KeyedLimiter<IpAddr>")
            .field("global_limiter", &"DirectLimiter")
            .finish()
    }
}

impl RateLimits {
    /// Create rate limiters from configuration.
    ///
    /// Zero quotas are raised to one request per period.
    pub fn new(config: &LimitsConfig) -> Self {
        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let per_second =
            NonZeroU32::new(config.global_requests_per_second).unwrap_or(NonZeroU32::MIN);

        Self {
            client_limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
            global_limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
        }
    }

    /// Check whether an allocating request is allowed.
    ///
    /// `client` is `None` when the peer address is unknown (in-process
    /// callers); only the global quota applies then.
    pub fn check(&self, client: Option<IpAddr>) -> Result<(), RateLimitError> {
        self.global_limiter
            .check()
            .map_err(|_| RateLimitError::GlobalLimitExceeded)?;

        if let Some(ip) = client {
            self.client_limiter
                .check_key(&ip)
                .map_err(|_| RateLimitError::ClientLimitExceeded)?;
        }
        Ok(())
    }

    /// Number of tracked client keys.
    pub fn client_keys_count(&self) -> usize {
        self.client_limiter.len()
    }

    /// Evict keys whose quota has fully recharged. Called from the sweep.
    pub fn shrink(&self) {
        self.client_limiter.retain_recent();
    }
}

/// Rate limit error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    /// Too many requests from this client.
    #[error("client rate limit exceeded")]
    ClientLimitExceeded,
    /// Too many requests across all clients.
    #[error("global rate limit exceeded")]
    GlobalLimitExceeded,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(per_minute: u32, per_second: u32) -> LimitsConfig {
        LimitsConfig {
            requests_per_minute: per_minute,
            global_requests_per_second: per_second,
        }
    }

    #[test]
    fn client_limit_allows_within_quota() {
        let limits = RateLimits::new(&config(3, 1000));
        let ip: IpAddr = "198.51.100.7".parse().unwrap();

        for _ in 0..3 {
            assert!(limits.check(Some(ip)).is_ok());
        }
        assert_eq!(
            limits.check(Some(ip)),
            Err(RateLimitError::ClientLimitExceeded)
        );
    }

    #[test]
    fn different_clients_have_independent_limits() {
        let limits = RateLimits::new(&config(1, 1000));
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limits.check(Some(a)).is_ok());
        assert!(limits.check(Some(a)).is_err());
        assert!(limits.check(Some(b)).is_ok());
        assert_eq!(limits.client_keys_count(), 2);
    }

    #[test]
    fn global_rate_limiter_rejects_excess() {
        let limits = RateLimits::new(&config(1000, 5));

        for _ in 0..5 {
            assert!(limits.check(None).is_ok());
        }
        assert_eq!(limits.check(None), Err(RateLimitError::GlobalLimitExceeded));
    }

    #[test]
    fn zero_quota_is_raised_to_one() {
        let limits = RateLimits::new(&config(0, 0));
        assert!(limits.check(None).is_ok());
        assert!(limits.check(None).is_err());
    }

    #[test]
    fn shrink_does_not_panic() {
        let limits = RateLimits::new(&config(10, 1000));
        let _ = limits.check(Some("10.0.0.9".parse().unwrap()));
        limits.shrink();
    }
}
