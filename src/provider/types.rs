//! Provider adapter types

use super::adapters::{RestAdapter, ShipHeroAdapter, ShopifyGraphqlAdapter, ShopifyRestAdapter};
use crate::error::{Error, Result};
use crate::http::{TransportRequest, TransportResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Budget information reported by a provider on one response
///
/// Every field is optional; providers report different subsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BudgetSignal {
    /// Capacity currently available
    pub available: Option<f64>,
    /// Bucket size
    pub maximum: Option<f64>,
    /// Capacity restored per second
    pub restore_rate: Option<f64>,
    /// Cost charged for the call that produced this response
    pub cost: Option<f64>,
}

impl BudgetSignal {
    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.available.is_none()
            && self.maximum.is_none()
            && self.restore_rate.is_none()
            && self.cost.is_none()
    }
}

/// Throttle signal with the provider's suggested wait
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitHint {
    /// How long the provider asks us to wait, if it says
    pub retry_after: Option<Duration>,
    /// Provider message
    pub message: String,
}

/// Outcome of classifying one response
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Usable response
    Success,
    /// HTTP 429 or a provider throttle payload
    RateLimited(RateLimitHint),
    /// Credentials rejected (401/403 or provider equivalent)
    AuthenticationFailure,
    /// 5xx
    Transient,
    /// Any other non-2xx status
    ClientError,
    /// 2xx with an error payload the adapter does not recognise as throttling
    PayloadError(String),
}

impl Verdict {
    /// Turn the verdict into the crate error taxonomy
    pub fn into_result(
        self,
        request: &TransportRequest,
        response: &TransportResponse,
    ) -> Result<()> {
        match self {
            Verdict::Success => Ok(()),
            Verdict::RateLimited(hint) => Err(Error::rate_limited(hint.retry_after, hint.message)),
            Verdict::AuthenticationFailure => Err(Error::auth(
                Some(response.status),
                format!("{} rejected credentials", request.describe()),
            )),
            Verdict::Transient => Err(Error::ServerError {
                status: response.status,
                body: response.context(request).body,
            }),
            Verdict::ClientError => Err(Error::http_status(
                response.status,
                response.context(request).body,
            )),
            Verdict::PayloadError(message) => Err(response.malformed(request, message)),
        }
    }
}

/// Which adapter a source uses
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderKind {
    /// Generic REST API (Faire, Loop Returns)
    #[default]
    Rest,
    /// Shopify Admin REST API
    ShopifyRest {
        /// Calls restored per second
        #[serde(default = "default_shopify_rest_restore")]
        restore_rate: f64,
    },
    /// Shopify Admin GraphQL API
    ShopifyGraphql,
    /// ShipHero GraphQL API
    Shiphero {
        /// Credit bucket size
        #[serde(default = "default_shiphero_max_credits")]
        maximum_credits: f64,
        /// Credits restored per second
        #[serde(default = "default_shiphero_restore")]
        restore_rate: f64,
    },
}

fn default_shopify_rest_restore() -> f64 {
    2.0
}

fn default_shiphero_max_credits() -> f64 {
    4004.0
}

fn default_shiphero_restore() -> f64 {
    60.0
}

impl ProviderKind {
    /// Build the adapter for this provider
    pub fn build(&self) -> Arc<dyn super::ProviderAdapter> {
        match self {
            ProviderKind::Rest => Arc::new(RestAdapter),
            ProviderKind::ShopifyRest { restore_rate } => {
                Arc::new(ShopifyRestAdapter::new(*restore_rate))
            }
            ProviderKind::ShopifyGraphql => Arc::new(ShopifyGraphqlAdapter),
            ProviderKind::Shiphero {
                maximum_credits,
                restore_rate,
            } => Arc::new(ShipHeroAdapter::new(*maximum_credits, *restore_rate)),
        }
    }

    /// Whether requests are GraphQL POSTs
    pub fn is_graphql(&self) -> bool {
        matches!(self, ProviderKind::ShopifyGraphql | ProviderKind::Shiphero { .. })
    }
}
