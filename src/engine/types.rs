//! Engine types
//!
//! Per-stream reports and run-wide statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// How a stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    /// Every page was fetched
    Completed,
    /// A fatal error stopped the fetch
    Aborted,
    /// Cancelled by the caller between pages
    Cancelled,
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamStatus::Completed => write!(f, "completed"),
            StreamStatus::Aborted => write!(f, "aborted"),
            StreamStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of running one stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamReport {
    /// Source name
    pub source: String,
    /// Stream name
    pub stream: String,
    /// How the stream ended
    pub status: StreamStatus,
    /// Error message when aborted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Pages fetched
    pub pages: u64,
    /// Rows written per entity
    pub records: BTreeMap<String, u64>,
    /// When the stream started
    pub started_at: DateTime<Utc>,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl StreamReport {
    /// Empty report for a stream that is starting now
    pub fn start(source: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            stream: stream.into(),
            status: StreamStatus::Completed,
            error: None,
            pages: 0,
            records: BTreeMap::new(),
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    /// Total rows across entities
    pub fn total_records(&self) -> u64 {
        self.records.values().sum()
    }

    /// Rows written for `entity`
    pub fn records_for(&self, entity: &str) -> u64 {
        self.records.get(entity).copied().unwrap_or(0)
    }

    /// Set the wall time
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_ms = duration.as_millis() as u64;
    }

    /// True when the stream completed
    pub fn is_completed(&self) -> bool {
        self.status == StreamStatus::Completed
    }
}

/// Totals across streams
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractStats {
    /// Rows written
    pub records: u64,
    /// Pages fetched
    pub pages: u64,
    /// Streams completed
    pub streams_completed: usize,
    /// Streams aborted
    pub streams_aborted: usize,
    /// Streams cancelled
    pub streams_cancelled: usize,
    /// Summed stream durations in milliseconds
    pub duration_ms: u64,
}

impl ExtractStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one stream's report
    pub fn add(&mut self, report: &StreamReport) {
        self.records += report.total_records();
        self.pages += report.pages;
        self.duration_ms += report.duration_ms;
        match report.status {
            StreamStatus::Completed => self.streams_completed += 1,
            StreamStatus::Aborted => self.streams_aborted += 1,
            StreamStatus::Cancelled => self.streams_cancelled += 1,
        }
    }

    /// Merge totals from another run
    pub fn merge(&mut self, other: &ExtractStats) {
        self.records += other.records;
        self.pages += other.pages;
        self.streams_completed += other.streams_completed;
        self.streams_aborted += other.streams_aborted;
        self.streams_cancelled += other.streams_cancelled;
        self.duration_ms += other.duration_ms;
    }

    /// Streams that did not complete
    pub fn failed(&self) -> usize {
        self.streams_aborted + self.streams_cancelled
    }
}
