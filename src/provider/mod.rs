//! Provider adapters
//!
//! Each API reports its budget and signals throttling differently. An
//! adapter hides those differences behind [`ProviderAdapter`] so the paged
//! fetcher, retry policy and budget tracker stay provider-agnostic.
//!
//! # Adapters
//!
//! - `RestAdapter`: HTTP 429 with `Retry-After` (Faire, Loop Returns)
//! - `ShopifyRestAdapter`: `X-Shopify-Shop-Api-Call-Limit` leaky bucket
//! - `ShopifyGraphqlAdapter`: `extensions.cost.throttleStatus`
//! - `ShipHeroAdapter`: query complexity and credit errors

mod adapters;
mod types;

pub use adapters::{
    graphql_errors, hint_duration, retry_after_header, RestAdapter, ShipHeroAdapter, ShopifyGraphqlAdapter,
    ShopifyRestAdapter,
};
pub use types::{BudgetSignal, ProviderKind, RateLimitHint, Verdict};

use crate::http::TransportResponse;

/// Provider-specific interpretation of responses
pub trait ProviderAdapter: Send + Sync + std::fmt::Debug {
    /// Adapter name for logs
    fn name(&self) -> &'static str;

    /// Budget reported on this response, if any
    fn extract_remaining_budget(&self, response: &TransportResponse) -> Option<BudgetSignal>;

    /// Throttle signal, if this response says we are rate limited
    fn is_rate_limited(&self, response: &TransportResponse) -> Option<RateLimitHint>;

    /// Whether credentials were rejected
    fn is_authentication_failure(&self, response: &TransportResponse) -> bool {
        matches!(response.status, 401 | 403)
    }

    /// Error payload on an otherwise successful response
    fn payload_error(&self, _response: &TransportResponse) -> Option<String> {
        None
    }

    /// Classify a response
    fn classify(&self, response: &TransportResponse) -> Verdict {
        if let Some(hint) = self.is_rate_limited(response) {
            return Verdict::RateLimited(hint);
        }
        if self.is_authentication_failure(response) {
            return Verdict::AuthenticationFailure;
        }
        if response.status >= 500 {
            return Verdict::Transient;
        }
        if !response.is_success() {
            return Verdict::ClientError;
        }
        if let Some(message) = self.payload_error(response) {
            return Verdict::PayloadError(message);
        }
        Verdict::Success
    }
}
