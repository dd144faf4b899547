//! Budget strategy configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a source throttles itself between calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BudgetStrategy {
    /// No provider signal: wait a fixed delay between calls
    FixedDelay {
        #[serde(default = "default_fixed_delay_ms")]
        min_delay_ms: u64,
    },

    /// Count requests against a ceiling per rolling window
    RequestCeiling {
        max_requests: u32,
        #[serde(default = "default_window_secs")]
        window_secs: u64,
    },

    /// Follow the budget the provider reports on each response
    Adaptive {
        /// Throttle once available capacity drops below `maximum * threshold`
        #[serde(default = "default_threshold")]
        threshold: f64,
        /// Lower bound for a throttling delay
        #[serde(default)]
        min_delay_ms: u64,
        /// Delay used while the available capacity is unknown
        #[serde(default = "default_fixed_delay_ms")]
        fallback_delay_ms: u64,
        /// Bucket size, when the provider does not report it
        #[serde(default)]
        maximum: Option<f64>,
        /// Restore rate per second, when the provider does not report it
        #[serde(default)]
        restore_rate: Option<f64>,
    },
}

fn default_fixed_delay_ms() -> u64 {
    500
}

fn default_window_secs() -> u64 {
    3600
}

fn default_threshold() -> f64 {
    0.5
}

impl Default for BudgetStrategy {
    fn default() -> Self {
        BudgetStrategy::FixedDelay {
            min_delay_ms: default_fixed_delay_ms(),
        }
    }
}

impl BudgetStrategy {
    /// Adaptive strategy with default threshold and delays
    pub fn adaptive() -> Self {
        BudgetStrategy::Adaptive {
            threshold: default_threshold(),
            min_delay_ms: 0,
            fallback_delay_ms: default_fixed_delay_ms(),
            maximum: None,
            restore_rate: None,
        }
    }

    /// Fixed delay strategy
    pub fn fixed(delay: Duration) -> Self {
        BudgetStrategy::FixedDelay {
            min_delay_ms: delay.as_millis() as u64,
        }
    }

    /// Request ceiling strategy
    pub fn ceiling(max_requests: u32, window: Duration) -> Self {
        BudgetStrategy::RequestCeiling {
            max_requests,
            window_secs: window.as_secs(),
        }
    }

    /// Strategy name for logs
    pub fn name(&self) -> &'static str {
        match self {
            BudgetStrategy::FixedDelay { .. } => "fixed_delay",
            BudgetStrategy::RequestCeiling { .. } => "request_ceiling",
            BudgetStrategy::Adaptive { .. } => "adaptive",
        }
    }

    /// Check the configured values are usable
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;
        match self {
            BudgetStrategy::FixedDelay { .. } => Ok(()),
            BudgetStrategy::RequestCeiling {
                max_requests,
                window_secs,
            } => {
                if *max_requests == 0 {
                    return Err(Error::invalid_value(
                        "budget.max_requests",
                        "must be greater than 0",
                    ));
                }
                if *window_secs == 0 {
                    return Err(Error::invalid_value(
                        "budget.window_secs",
                        "must be greater than 0",
                    ));
                }
                Ok(())
            }
            BudgetStrategy::Adaptive {
                threshold,
                maximum,
                restore_rate,
                ..
            } => {
                if !threshold.is_finite() || *threshold <= 0.0 || *threshold > 1.0 {
                    return Err(Error::invalid_value(
                        "budget.threshold",
                        "must be in (0, 1]",
                    ));
                }
                if maximum.is_some_and(|m| !m.is_finite() || m <= 0.0) {
                    return Err(Error::invalid_value("budget.maximum", "must be positive"));
                }
                if restore_rate.is_some_and(|r| !r.is_finite() || r <= 0.0) {
                    return Err(Error::invalid_value(
                        "budget.restore_rate",
                        "must be positive",
                    ));
                }
                Ok(())
            }
        }
    }
}
