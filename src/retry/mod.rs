//! Retry/backoff policy
//!
//! Retryable failures (network, timeout, 5xx, rate limiting) are absorbed
//! here; fatal ones pass straight through. The loop is always bounded by
//! `max_retries`.

mod policy;

pub use policy::{RetryPolicy, RetryState};
