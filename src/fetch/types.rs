//! Fetch types

use crate::types::JsonValue;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One successfully fetched page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// 1-based page number within the fetch
    pub number: u64,
    /// Raw provider-shaped records
    pub records: Vec<JsonValue>,
    /// Cursor for the next page, `None` on the last page
    pub next_cursor: Option<String>,
    /// Remaining budget estimate after this call
    pub remaining_budget: Option<f64>,
    /// HTTP status of the response
    pub status: u16,
}

impl Page {
    /// Number of records on this page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the page has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Caller-driven cancellation, checked between pages
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A token that is never cancelled until [`cancel`](Self::cancel) is called
    pub fn new() -> Self {
        Self::default()
    }

    /// Also cancel once `deadline` has passed
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Also cancel after `timeout` from now
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested or the deadline passed
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
