//! Client-side request budget for the upstream API.
//!
//! The budget never waits or retries. When it is exhausted the adapter fails
//! the call with a rate-limit error carrying the remaining wait.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock as _, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

/// Upstream call quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub window: Duration,
    pub limit: u32,
}

impl QuotaPolicy {
    /// Alpha Vantage free tier: five calls per minute.
    pub const fn alphavantage_free_tier() -> Self {
        Self {
            window: Duration::from_secs(60),
            limit: 5,
        }
    }
}

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared rate limiter spreading `limit` calls evenly over `window`, with the
/// full limit available as an initial burst.
#[derive(Clone)]
pub struct RequestThrottle {
    limiter: Arc<DirectRateLimiter>,
}

impl RequestThrottle {
    pub fn new(policy: QuotaPolicy) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota_from_policy(policy))),
        }
    }

    /// Takes one unit of budget, or returns how long until one is available.
    pub fn acquire(&self) -> Result<(), Duration> {
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new(QuotaPolicy::alphavantage_free_tier())
    }
}

fn quota_from_policy(policy: QuotaPolicy) -> Quota {
    let burst = NonZeroU32::new(policy.limit).unwrap_or(NonZeroU32::MIN);

    let seconds_per_cell = (policy.window.as_secs_f64() / f64::from(burst.get())).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    // `period` is clamped above zero, so `with_period` always yields a quota.
    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}
