//! Execution engine module
//!
//! Per-stream orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `ExtractEngine` - Drives a paged fetch, flattens each page and hands the
//!   rows to a sink
//! - `StreamReport` / `StreamStatus` - How a stream ended
//! - `ExtractStats` - Totals across streams

mod types;

pub use types::{ExtractStats, StreamReport, StreamStatus};

use crate::error::{Error, Result};
use crate::fetch::{Page, PagedFetcher};
use crate::flatten::{flatten, EntitySchema};
use crate::output::RecordSink;
use futures::StreamExt;
use std::time::Instant;
use tracing::{error, info, warn};

/// Report plus the fatal error, if any, of one stream run
#[derive(Debug)]
pub struct StreamOutcome {
    pub report: StreamReport,
    pub error: Option<Error>,
}

impl StreamOutcome {
    /// The report, or the error that aborted the stream
    pub fn into_result(self) -> Result<StreamReport> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.report),
        }
    }
}

/// Runs streams of one source
#[derive(Debug)]
pub struct ExtractEngine {
    source: String,
    stats: ExtractStats,
}

impl ExtractEngine {
    /// Create an engine for `source`
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            stats: ExtractStats::default(),
        }
    }

    /// Source name
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Totals so far
    pub fn stats(&self) -> &ExtractStats {
        &self.stats
    }

    /// Fetch every page of a stream, flatten it and write it to `sink`
    ///
    /// Pages written before a fatal error stay in the sink; the report is
    /// returned either way.
    pub async fn run_stream(
        &mut self,
        fetcher: PagedFetcher,
        schema: &EntitySchema,
        sink: &mut dyn RecordSink,
    ) -> StreamOutcome {
        let start = Instant::now();
        let stream = fetcher.name().to_string();
        let mut report = StreamReport::start(&self.source, &stream);

        info!(source = %self.source, stream = %stream, "Starting stream");

        let mut failure = sink.begin(&stream, schema).err();

        if failure.is_none() {
            let mut pages = fetcher.fetch_all();
            while let Some(item) = pages.next().await {
                let result =
                    item.and_then(|page| Self::write_page(&page, schema, sink, &mut report));
                match result {
                    Ok(()) => {}
                    Err(Error::Cancelled { pages }) => {
                        warn!(source = %self.source, stream = %stream, pages, "Stream cancelled");
                        report.status = StreamStatus::Cancelled;
                        break;
                    }
                    Err(err) => {
                        failure = Some(err);
                        break;
                    }
                }
            }
        }

        if let Some(err) = &failure {
            report.status = StreamStatus::Aborted;
            report.error = Some(err.to_string());
        }
        report.set_duration(start.elapsed());

        if let Err(err) = sink.finish(&report) {
            error!(source = %self.source, stream = %stream, error = %err, "Failed to finish output");
            if failure.is_none() {
                report.status = StreamStatus::Aborted;
                report.error = Some(err.to_string());
                failure = Some(err);
            }
        }

        match &failure {
            None => info!(
                source = %self.source,
                stream = %stream,
                status = %report.status,
                pages = report.pages,
                records = report.total_records(),
                duration_ms = report.duration_ms,
                "Stream finished"
            ),
            Some(err) => error!(
                source = %self.source,
                stream = %stream,
                pages = report.pages,
                records = report.total_records(),
                kind = err.kind(),
                error = %err,
                "Stream aborted"
            ),
        }

        self.stats.add(&report);
        StreamOutcome {
            report,
            error: failure,
        }
    }

    /// Report a stream that was not started because the run was cancelled
    pub fn skip_stream(
        &mut self,
        stream: &str,
        schema: &EntitySchema,
        sink: &mut dyn RecordSink,
    ) -> StreamOutcome {
        let mut report = StreamReport::start(&self.source, stream);
        report.status = StreamStatus::Cancelled;
        report.error = Some("cancelled before the stream started".to_string());

        warn!(source = %self.source, stream, "Skipping stream after cancellation");
        let error = sink.skip(&report, schema).err();
        if let Some(err) = &error {
            error!(source = %self.source, stream, error = %err, "Failed to record skipped stream");
        }

        self.stats.add(&report);
        StreamOutcome { report, error }
    }

    fn write_page(
        page: &Page,
        schema: &EntitySchema,
        sink: &mut dyn RecordSink,
        report: &mut StreamReport,
    ) -> Result<()> {
        let rows = flatten(page, schema)?;
        sink.write(&rows)?;

        report.pages += 1;
        for row in &rows {
            *report.records.entry(row.entity.clone()).or_default() += 1;
        }
        Ok(())
    }
}

/// Fetch a single page to verify credentials and reachability
pub async fn check(fetcher: PagedFetcher) -> Result<Page> {
    let stream = fetcher.name().to_string();
    let mut pages = fetcher.max_pages(Some(1)).fetch_all();
    let page = pages
        .next()
        .await
        .ok_or_else(|| Error::Other(format!("stream '{stream}' returned no response")))??;

    info!(stream = %stream, records = page.len(), status = page.status, "Check succeeded");
    Ok(page)
}

#[cfg(test)]
mod tests;
