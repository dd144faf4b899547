//! Bounded retry with backoff

use crate::error::{Error, Result};
use crate::sleep::Sleeper;
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry configuration for one source
///
/// `max_retries` has no default and must be set explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for computed backoff
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Backoff growth
    #[serde(default)]
    pub backoff: BackoffType,
    /// Longest provider wait hint honoured as given; longer hints are clamped
    #[serde(default = "default_max_hint_ms")]
    pub max_hint_ms: u64,
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_max_hint_ms() -> u64 {
    900_000
}

/// Progress of one logical request through the retry loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Retries performed so far
    pub attempt: u32,
    /// Kind of the most recent retryable failure
    pub last_failure: Option<&'static str>,
    /// Time spent backing off
    pub total_backoff: Duration,
}

impl RetryPolicy {
    /// Exponential policy with the given cap and base delay
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay_ms: base_delay.as_millis() as u64,
            max_delay_ms: default_max_delay_ms(),
            backoff: BackoffType::Exponential,
            max_hint_ms: default_max_hint_ms(),
        }
    }

    /// Set the backoff ceiling
    #[must_use]
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay_ms = max_delay.as_millis() as u64;
        self
    }

    /// Set the ceiling for provider wait hints
    #[must_use]
    pub fn max_hint(mut self, max_hint: Duration) -> Self {
        self.max_hint_ms = max_hint.as_millis() as u64;
        self
    }

    /// Set the backoff type
    #[must_use]
    pub fn backoff(mut self, backoff: BackoffType) -> Self {
        self.backoff = backoff;
        self
    }

    /// Reject policies that could retry forever or never wait
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(Error::invalid_value(
                "retry.max_retries",
                "must be greater than 0",
            ));
        }
        if self.base_delay_ms == 0 {
            return Err(Error::invalid_value(
                "retry.base_delay_ms",
                "must be greater than 0",
            ));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(Error::invalid_value(
                "retry.max_delay_ms",
                "must not be less than base_delay_ms",
            ));
        }
        Ok(())
    }

    /// Backoff delay before retry number `attempt + 1`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let base = Duration::from_millis(self.base_delay_ms);
        let delay = match self.backoff {
            BackoffType::Constant => base,
            BackoffType::Linear => base.saturating_mul(attempt.saturating_add(1)),
            BackoffType::Exponential => base.saturating_mul(2u32.saturating_pow(attempt)),
        };

        std::cmp::min(delay, Duration::from_millis(self.max_delay_ms))
    }

    /// Provider wait hint, clamped to `max_hint_ms`
    pub fn hinted_delay(&self, hint: Duration) -> Duration {
        let ceiling = Duration::from_millis(self.max_hint_ms);
        if hint > ceiling {
            warn!(
                hint_ms = hint.as_millis() as u64,
                max_hint_ms = self.max_hint_ms,
                "Provider wait hint exceeds ceiling, clamping"
            );
            ceiling
        } else {
            hint
        }
    }

    /// Run `op` until it succeeds, fails fatally, or retries run out
    pub async fn execute<T, F, Fut>(&self, sleeper: &dyn Sleeper, op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut state = RetryState::default();
        self.execute_tracked(sleeper, &mut state, op).await
    }

    /// Like [`execute`](Self::execute), leaving the final state in `state`
    pub async fn execute_tracked<T, F, Fut>(
        &self,
        sleeper: &dyn Sleeper,
        state: &mut RetryState,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        loop {
            let err = match op(state.attempt).await {
                Ok(value) => {
                    if state.attempt > 0 {
                        debug!(attempt = state.attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(err);
            }

            if state.attempt >= self.max_retries {
                warn!(
                    attempts = state.attempt + 1,
                    error = %err,
                    "Retries exhausted"
                );
                return Err(Error::ExhaustedRetries {
                    attempts: state.attempt + 1,
                    last: Box::new(err),
                });
            }

            let delay = match &err {
                Error::RateLimited {
                    retry_after: Some(wait),
                    ..
                } => self.hinted_delay(*wait),
                _ => self.backoff_for(state.attempt),
            };

            warn!(
                attempt = state.attempt + 1,
                delay_ms = delay.as_millis() as u64,
                kind = err.kind(),
                "Request failed ({}), attempt {}/{}, retrying in {:?}",
                err,
                state.attempt + 1,
                self.max_retries + 1,
                delay
            );

            sleeper.sleep(delay).await;
            state.attempt += 1;
            state.last_failure = Some(err.kind());
            state.total_backoff += delay;
        }
    }
}
