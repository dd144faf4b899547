//! Provider adapter implementations

use super::types::{BudgetSignal, RateLimitHint};
use super::ProviderAdapter;
use crate::http::TransportResponse;
use crate::types::JsonValue;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Matches "try again in 94 seconds" / "94 seconds"
static SECONDS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*seconds?").expect("Invalid seconds regex")
});

/// `Retry-After` header as a duration (integer or fractional seconds)
pub fn retry_after_header(response: &TransportResponse) -> Option<Duration> {
    response
        .header("retry-after")
        .and_then(|s| s.trim().parse::<f64>().ok())
        .and_then(hint_duration)
}

/// Seconds as a wait hint; `None` when negative, NaN or too large for a `Duration`
pub fn hint_duration(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

/// The GraphQL `errors` array, empty when absent
pub fn graphql_errors(body: &JsonValue) -> &[JsonValue] {
    body.get("errors")
        .and_then(JsonValue::as_array)
        .map_or(&[][..], Vec::as_slice)
}

fn error_messages(errors: &[JsonValue]) -> String {
    let messages: Vec<String> = errors
        .iter()
        .map(|e| {
            e.get("message")
                .and_then(JsonValue::as_str)
                .map_or_else(|| e.to_string(), str::to_string)
        })
        .collect();
    messages.join("; ")
}

fn http_429(response: &TransportResponse) -> Option<RateLimitHint> {
    (response.status == 429).then(|| RateLimitHint {
        retry_after: retry_after_header(response),
        message: format!("HTTP 429: {}", response.body_text()),
    })
}

fn parse_seconds(text: &str) -> Option<Duration> {
    SECONDS_REGEX
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .and_then(hint_duration)
}

// ============================================================================
// Generic REST
// ============================================================================

/// REST API with no budget signal (Faire, Loop Returns)
#[derive(Debug, Clone, Copy, Default)]
pub struct RestAdapter;

impl ProviderAdapter for RestAdapter {
    fn name(&self) -> &'static str {
        "rest"
    }

    fn extract_remaining_budget(&self, _response: &TransportResponse) -> Option<BudgetSignal> {
        None
    }

    fn is_rate_limited(&self, response: &TransportResponse) -> Option<RateLimitHint> {
        http_429(response)
    }
}

// ============================================================================
// Shopify REST
// ============================================================================

/// Shopify Admin REST: leaky bucket reported as `used/max`
#[derive(Debug, Clone, Copy)]
pub struct ShopifyRestAdapter {
    restore_rate: f64,
}

impl ShopifyRestAdapter {
    /// Adapter with the given bucket restore rate (calls per second)
    pub fn new(restore_rate: f64) -> Self {
        Self { restore_rate }
    }
}

impl Default for ShopifyRestAdapter {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl ProviderAdapter for ShopifyRestAdapter {
    fn name(&self) -> &'static str {
        "shopify_rest"
    }

    fn extract_remaining_budget(&self, response: &TransportResponse) -> Option<BudgetSignal> {
        let header = response.header("x-shopify-shop-api-call-limit")?;
        let (used, max) = header.split_once('/')?;
        let used: f64 = used.trim().parse().ok()?;
        let max: f64 = max.trim().parse().ok()?;

        Some(BudgetSignal {
            available: Some((max - used).max(0.0)),
            maximum: Some(max),
            restore_rate: Some(self.restore_rate),
            cost: Some(1.0),
        })
    }

    fn is_rate_limited(&self, response: &TransportResponse) -> Option<RateLimitHint> {
        http_429(response)
    }
}

// ============================================================================
// Shopify GraphQL
// ============================================================================

/// Shopify Admin GraphQL: calculated query cost
#[derive(Debug, Clone, Copy, Default)]
pub struct ShopifyGraphqlAdapter;

impl ShopifyGraphqlAdapter {
    fn cost(body: &JsonValue) -> Option<&JsonValue> {
        body.pointer("/extensions/cost")
    }
}

impl ProviderAdapter for ShopifyGraphqlAdapter {
    fn name(&self) -> &'static str {
        "shopify_graphql"
    }

    fn extract_remaining_budget(&self, response: &TransportResponse) -> Option<BudgetSignal> {
        let cost = Self::cost(&response.body)?;
        let throttle = cost.get("throttleStatus");
        let field = |name: &str| throttle.and_then(|t| t.get(name)).and_then(JsonValue::as_f64);

        let signal = BudgetSignal {
            available: field("currentlyAvailable"),
            maximum: field("maximumAvailable"),
            restore_rate: field("restoreRate"),
            cost: cost
                .get("actualQueryCost")
                .and_then(JsonValue::as_f64)
                .or_else(|| cost.get("requestedQueryCost").and_then(JsonValue::as_f64)),
        };
        (!signal.is_empty()).then_some(signal)
    }

    fn is_rate_limited(&self, response: &TransportResponse) -> Option<RateLimitHint> {
        if let Some(hint) = http_429(response) {
            return Some(hint);
        }

        let errors = graphql_errors(&response.body);
        let throttled = errors.iter().any(|e| {
            e.pointer("/extensions/code").and_then(JsonValue::as_str) == Some("THROTTLED")
        });
        if !throttled {
            return None;
        }

        let cost = Self::cost(&response.body);
        let num = |ptr: &str| cost.and_then(|c| c.pointer(ptr)).and_then(JsonValue::as_f64);
        let retry_after = match (
            num("/requestedQueryCost"),
            num("/throttleStatus/currentlyAvailable"),
            num("/throttleStatus/restoreRate"),
        ) {
            (Some(requested), Some(available), Some(rate)) if rate > 0.0 => {
                hint_duration(((requested - available) / rate).max(0.0))
            }
            _ => None,
        };

        Some(RateLimitHint {
            retry_after,
            message: error_messages(errors),
        })
    }

    fn is_authentication_failure(&self, response: &TransportResponse) -> bool {
        matches!(response.status, 401 | 403)
            || graphql_errors(&response.body).iter().any(|e| {
                e.pointer("/extensions/code").and_then(JsonValue::as_str) == Some("ACCESS_DENIED")
            })
    }

    fn payload_error(&self, response: &TransportResponse) -> Option<String> {
        let errors = graphql_errors(&response.body);
        (!errors.is_empty()).then(|| error_messages(errors))
    }
}

// ============================================================================
// ShipHero
// ============================================================================

/// ShipHero GraphQL: credit bucket charged by query complexity
#[derive(Debug, Clone, Copy)]
pub struct ShipHeroAdapter {
    maximum_credits: f64,
    restore_rate: f64,
}

impl ShipHeroAdapter {
    /// Adapter with the account's credit bucket size and restore rate
    pub fn new(maximum_credits: f64, restore_rate: f64) -> Self {
        Self {
            maximum_credits,
            restore_rate,
        }
    }

    fn is_credit_error(error: &JsonValue) -> bool {
        error.get("code").and_then(JsonValue::as_i64) == Some(30)
            || error
                .get("message")
                .and_then(JsonValue::as_str)
                .is_some_and(|m| m.to_lowercase().contains("not enough credits"))
    }
}

impl Default for ShipHeroAdapter {
    fn default() -> Self {
        Self::new(4004.0, 60.0)
    }
}

impl ProviderAdapter for ShipHeroAdapter {
    fn name(&self) -> &'static str {
        "shiphero"
    }

    fn extract_remaining_budget(&self, response: &TransportResponse) -> Option<BudgetSignal> {
        let cost = response
            .body
            .get("data")
            .and_then(JsonValue::as_object)
            .and_then(|data| {
                data.values()
                    .find_map(|op| op.get("complexity").and_then(JsonValue::as_f64))
            });
        let available = graphql_errors(&response.body)
            .iter()
            .find_map(|e| e.get("remaining_credits").and_then(JsonValue::as_f64));

        if cost.is_none() && available.is_none() {
            return None;
        }

        Some(BudgetSignal {
            available,
            maximum: Some(self.maximum_credits),
            restore_rate: Some(self.restore_rate),
            cost,
        })
    }

    fn is_rate_limited(&self, response: &TransportResponse) -> Option<RateLimitHint> {
        if let Some(hint) = http_429(response) {
            return Some(hint);
        }

        let errors = graphql_errors(&response.body);
        let error = errors.iter().find(|e| Self::is_credit_error(e))?;

        let retry_after = error
            .get("time_remaining")
            .and_then(JsonValue::as_str)
            .and_then(parse_seconds)
            .or_else(|| {
                error
                    .get("message")
                    .and_then(JsonValue::as_str)
                    .and_then(parse_seconds)
            })
            .or_else(|| {
                let required = error.get("required_credits").and_then(JsonValue::as_f64)?;
                let remaining = error.get("remaining_credits").and_then(JsonValue::as_f64)?;
                if self.restore_rate > 0.0 {
                    hint_duration(((required - remaining) / self.restore_rate).max(0.0))
                } else {
                    None
                }
            });

        Some(RateLimitHint {
            retry_after,
            message: error_messages(std::slice::from_ref(error)),
        })
    }

    fn payload_error(&self, response: &TransportResponse) -> Option<String> {
        let errors = graphql_errors(&response.body);
        (!errors.is_empty()).then(|| error_messages(errors))
    }
}
