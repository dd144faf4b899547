//! Rate budget tracker
//!
//! One [`RateBudget`] is owned by each paged fetch. It decides how long to
//! wait before the next call and learns from the budget signal of every
//! response.

use super::limiter::RequestLimiter;
use super::strategy::BudgetStrategy;
use crate::provider::BudgetSignal;
use crate::sleep::Sleeper;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Last known provider budget
#[derive(Debug, Clone, Copy, Default)]
struct Observed {
    available: Option<f64>,
    maximum: Option<f64>,
    restore_rate: Option<f64>,
    last_cost: Option<f64>,
    at: Option<Instant>,
}

/// Per-fetch throttling state
#[derive(Debug)]
pub struct RateBudget {
    strategy: BudgetStrategy,
    sleeper: Arc<dyn Sleeper>,
    limiter: Option<RequestLimiter>,
    observed: Observed,
    requests: u64,
    total_delay: Duration,
}

impl RateBudget {
    /// Create a tracker for one fetch
    pub fn new(strategy: BudgetStrategy, sleeper: Arc<dyn Sleeper>) -> Self {
        let limiter = match &strategy {
            BudgetStrategy::RequestCeiling {
                max_requests,
                window_secs,
            } => Some(RequestLimiter::new(
                *max_requests,
                Duration::from_secs(*window_secs),
            )),
            _ => None,
        };

        let observed = match &strategy {
            BudgetStrategy::Adaptive {
                maximum,
                restore_rate,
                ..
            } => Observed {
                maximum: *maximum,
                restore_rate: *restore_rate,
                ..Observed::default()
            },
            _ => Observed::default(),
        };

        Self {
            strategy,
            sleeper,
            limiter,
            observed,
            requests: 0,
            total_delay: Duration::ZERO,
        }
    }

    /// Wait until the next call is permitted; returns the time slept
    pub async fn before_call(&mut self) -> Duration {
        let delay = match &self.limiter {
            Some(limiter) => limiter.acquire(),
            None => self.next_delay(),
        };

        if !delay.is_zero() {
            debug!(
                strategy = self.strategy.name(),
                delay_ms = delay.as_millis() as u64,
                available = self.observed.available,
                "Throttling before next call"
            );
            self.sleeper.sleep(delay).await;
            self.total_delay += delay;
            if let Some(limiter) = &self.limiter {
                limiter.settle();
            }
        }

        delay
    }

    /// Update state after a call
    pub fn record(&mut self, signal: Option<&BudgetSignal>) {
        self.requests += 1;

        let Some(signal) = signal else {
            return;
        };
        let now = Instant::now();
        let observed = &mut self.observed;

        if signal.maximum.is_some() {
            observed.maximum = signal.maximum;
        }
        if signal.restore_rate.is_some() {
            observed.restore_rate = signal.restore_rate;
        }
        if signal.cost.is_some() {
            observed.last_cost = signal.cost;
        }

        match (signal.available, signal.cost) {
            (Some(available), _) => observed.available = Some(available),
            (None, Some(cost)) => {
                // Decay our own estimate, starting from a full bucket
                let start = match (observed.available, observed.at) {
                    (Some(prev), Some(at)) => {
                        let restored = observed.restore_rate.unwrap_or(0.0)
                            * now.duration_since(at).as_secs_f64();
                        Some(prev + restored)
                    }
                    (Some(prev), None) => Some(prev),
                    (None, _) => observed.maximum,
                };
                observed.available = start.map(|a| {
                    let max = observed.maximum.unwrap_or(f64::INFINITY);
                    (a - cost).clamp(0.0, max)
                });
            }
            (None, None) => {}
        }
        observed.at = Some(now);
    }

    /// Delay the next call would wait, without sleeping
    pub fn next_delay(&self) -> Duration {
        if self.requests == 0 {
            return Duration::ZERO;
        }

        match &self.strategy {
            BudgetStrategy::FixedDelay { min_delay_ms } => Duration::from_millis(*min_delay_ms),
            // The limiter decides at call time
            BudgetStrategy::RequestCeiling { .. } => Duration::ZERO,
            BudgetStrategy::Adaptive {
                threshold,
                min_delay_ms,
                fallback_delay_ms,
                ..
            } => adaptive_delay(
                &self.observed,
                *threshold,
                Duration::from_millis(*min_delay_ms),
                Duration::from_millis(*fallback_delay_ms),
            ),
        }
    }

    /// Last known available capacity
    pub fn remaining(&self) -> Option<f64> {
        self.observed.available
    }

    /// Calls recorded so far
    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Total time spent throttling
    pub fn total_delay(&self) -> Duration {
        self.total_delay
    }

    /// The configured strategy
    pub fn strategy(&self) -> &BudgetStrategy {
        &self.strategy
    }
}

fn adaptive_delay(
    observed: &Observed,
    threshold: f64,
    min_delay: Duration,
    fallback: Duration,
) -> Duration {
    let (Some(available), Some(maximum)) = (observed.available, observed.maximum) else {
        return fallback;
    };

    if available >= maximum * threshold {
        return Duration::ZERO;
    }

    let Some(rate) = observed.restore_rate.filter(|r| *r > 0.0) else {
        return fallback.max(min_delay);
    };

    let secs = observed.last_cost.unwrap_or(0.0) / rate;
    let delay = Duration::try_from_secs_f64(secs).unwrap_or(fallback);
    delay.max(min_delay)
}
