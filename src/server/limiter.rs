//! Request limiting per client address.

use std::net::IpAddr;
use std::num::NonZeroU32;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::config::RateLimit;

/// Keyed GCRA limiter: a full burst of `max_requests` is available up front
/// and refills at one request per `window / max_requests`.
pub struct AddressLimiter {
    inner: DefaultKeyedRateLimiter<IpAddr>,
}

impl AddressLimiter {
    pub fn new(limit: RateLimit) -> Self {
        Self {
            inner: RateLimiter::keyed(quota(limit)),
        }
    }

    /// Count a request from `ip`; `false` once its allowance is spent.
    pub fn check(&self, ip: IpAddr) -> bool {
        self.inner.check_key(&ip).is_ok()
    }

    /// Forget addresses whose allowance has fully refilled.
    pub fn prune(&self) {
        self.inner.retain_recent();
        self.inner.shrink_to_fit();
    }

    pub fn tracked(&self) -> usize {
        self.inner.len()
    }
}

fn quota(limit: RateLimit) -> Quota {
    let burst = NonZeroU32::new(limit.max_requests).unwrap_or(NonZeroU32::MIN);
    Quota::with_period(limit.window / burst.get())
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}
