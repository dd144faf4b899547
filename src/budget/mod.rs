//! Rate budget tracking
//!
//! Three strategies, chosen per source:
//!
//! - **fixed_delay**: the provider reports nothing, wait a fixed delay
//! - **request_ceiling**: requests per rolling window, enforced with governor
//! - **adaptive**: follow the provider's reported available/maximum/restore
//!   rate and the cost of the last call

mod limiter;
mod strategy;
mod tracker;

pub use limiter::RequestLimiter;
pub use strategy::BudgetStrategy;
pub use tracker::RateBudget;

#[cfg(test)]
mod tests;
