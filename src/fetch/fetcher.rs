//! Paged fetcher
//!
//! Drives repeated transport calls, feeding each page's cursor into the next
//! request, with the rate budget consulted before and after every call and
//! the retry policy wrapped around it.

use super::types::{Cancellation, Page};
use crate::budget::{BudgetStrategy, RateBudget};
use crate::decode::{JsonDecoder, RecordDecoder};
use crate::error::{Error, Result};
use crate::http::{Transport, TransportRequest, TransportResponse};
use crate::pagination::{NoPaginator, PageRequestBuilder, Paginator};
use crate::provider::ProviderAdapter;
use crate::retry::{RetryPolicy, RetryState};
use crate::sleep::{Sleeper, TokioSleeper};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lazy, finite sequence of pages for one stream
///
/// Restartable from scratch only: each call to
/// [`fetch_all`](Self::fetch_all) consumes the fetcher.
#[derive(Debug)]
pub struct PagedFetcher {
    name: String,
    transport: Arc<dyn Transport>,
    adapter: Arc<dyn ProviderAdapter>,
    requests: PageRequestBuilder,
    retry: RetryPolicy,
    paginator: Arc<dyn Paginator>,
    decoder: Arc<dyn RecordDecoder>,
    budget: BudgetStrategy,
    sleeper: Arc<dyn Sleeper>,
    cancellation: Cancellation,
    max_pages: Option<u64>,
}

impl PagedFetcher {
    /// Create a fetcher; pagination defaults to a single page
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn Transport>,
        adapter: Arc<dyn ProviderAdapter>,
        requests: PageRequestBuilder,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            transport,
            adapter,
            requests,
            retry,
            paginator: Arc::new(NoPaginator),
            decoder: Arc::new(JsonDecoder::new()),
            budget: BudgetStrategy::default(),
            sleeper: Arc::new(TokioSleeper),
            cancellation: Cancellation::new(),
            max_pages: None,
        }
    }

    /// Set the paginator
    #[must_use]
    pub fn paginator(mut self, paginator: Arc<dyn Paginator>) -> Self {
        self.paginator = paginator;
        self
    }

    /// Set the record decoder
    #[must_use]
    pub fn decoder(mut self, decoder: Arc<dyn RecordDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Set the budget strategy
    #[must_use]
    pub fn budget(mut self, budget: BudgetStrategy) -> Self {
        self.budget = budget;
        self
    }

    /// Set the sleeper used for throttling and backoff
    #[must_use]
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Set the cancellation token
    #[must_use]
    pub fn cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Stop after `max_pages` pages
    #[must_use]
    pub fn max_pages(mut self, max_pages: Option<u64>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Stream name used in logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetch every page
    ///
    /// A fatal error is yielded once and ends the stream. Pages yielded
    /// before it are complete.
    pub fn fetch_all(self) -> BoxStream<'static, Result<Page>> {
        let budget = RateBudget::new(self.budget.clone(), Arc::clone(&self.sleeper));
        let state = FetchState {
            fetcher: self,
            budget,
            cursor: None,
            first_call: true,
            pages: 0,
            done: false,
        };

        stream::unfold(state, |mut state| async move {
            let item = state.next_page().await?;
            Some((item, state))
        })
        .boxed()
    }
}

struct FetchState {
    fetcher: PagedFetcher,
    budget: RateBudget,
    cursor: Option<String>,
    first_call: bool,
    pages: u64,
    done: bool,
}

impl FetchState {
    async fn next_page(&mut self) -> Option<Result<Page>> {
        if self.done {
            return None;
        }

        let result = self.fetch_one().await;
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }

    async fn fetch_one(&mut self) -> Result<Page> {
        let f = &self.fetcher;

        if f.cancellation.is_cancelled() {
            info!(stream = %f.name, pages = self.pages, "Fetch cancelled");
            return Err(Error::Cancelled { pages: self.pages });
        }

        self.budget.before_call().await;

        let request = f.requests.build(self.first_call, self.cursor.as_deref());
        let mut retry_state = RetryState::default();
        let response = f
            .retry
            .execute_tracked(f.sleeper.as_ref(), &mut retry_state, |_| {
                call_and_classify(f.transport.as_ref(), f.adapter.as_ref(), &request)
            })
            .await?;

        let signal = f.adapter.extract_remaining_budget(&response);
        self.budget.record(signal.as_ref());

        let records = f.decoder.decode(&response.body).map_err(|e| match e {
            Error::Decode { message } | Error::JsonPath { message } => {
                response.malformed(&request, message)
            }
            other => other,
        })?;

        let mut next_cursor = f.paginator.next_cursor(&response.body, &response.headers);
        if next_cursor.is_some() && next_cursor == self.cursor {
            warn!(
                stream = %f.name,
                cursor = ?next_cursor,
                "Provider returned the same cursor again, stopping"
            );
            next_cursor = None;
        }

        self.pages += 1;
        let page = Page {
            number: self.pages,
            records,
            next_cursor,
            remaining_budget: self.budget.remaining(),
            status: response.status,
        };

        info!(
            stream = %f.name,
            page = page.number,
            records = page.len(),
            has_next = page.next_cursor.is_some(),
            remaining_budget = page.remaining_budget,
            retries = retry_state.attempt,
            "Fetched page"
        );

        let hit_max = f.max_pages.is_some_and(|max| self.pages >= max);
        if page.next_cursor.is_none() || page.is_empty() || hit_max {
            if hit_max && page.next_cursor.is_some() {
                debug!(stream = %f.name, pages = self.pages, "Reached max pages");
            }
            self.done = true;
        }

        self.cursor.clone_from(&page.next_cursor);
        self.first_call = false;

        Ok(page)
    }
}

async fn call_and_classify(
    transport: &dyn Transport,
    adapter: &dyn ProviderAdapter,
    request: &TransportRequest,
) -> Result<TransportResponse> {
    let response = transport.call(request).await?;
    adapter.classify(&response).into_result(request, &response)?;
    Ok(response)
}
