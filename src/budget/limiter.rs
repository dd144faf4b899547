//! Request ceiling limiter
//!
//! Uses the governor crate to count requests against a fixed ceiling per
//! rolling window (e.g. Faire's 1000 requests per hour).

use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// GCRA limiter admitting `max_requests` per `window`
#[derive(Clone)]
pub struct RequestLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    clock: DefaultClock,
    max_requests: u32,
    window: Duration,
}

impl RequestLimiter {
    /// Create a limiter for `max_requests` per `window`
    ///
    /// The whole ceiling is available as a burst; after that calls are
    /// spaced `window / max_requests` apart.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(max_requests).unwrap_or(NonZeroU32::MIN);
        let period = window / burst.get();
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: Arc::new(Governor::direct(quota)),
            clock: DefaultClock::default(),
            max_requests: burst.get(),
            window,
        }
    }

    /// Take a permit, returning how long the caller must wait first
    ///
    /// `Duration::ZERO` means the permit was granted immediately.
    pub fn acquire(&self) -> Duration {
        match self.limiter.check() {
            Ok(()) => Duration::ZERO,
            Err(not_until) => not_until.wait_time_from(self.clock.now()),
        }
    }

    /// Claim the permit after having waited
    pub fn settle(&self) {
        // The caller already slept the wait time; a second refusal only
        // happens under a fake clock and is ignored.
        let _ = self.limiter.check();
    }

    /// Configured ceiling
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Configured window
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl std::fmt::Debug for RequestLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLimiter")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
