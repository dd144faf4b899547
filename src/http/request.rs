//! Transport request and response types

use crate::error::{Error, ResponseContext, Result};
use crate::types::{JsonValue, Method};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::json;

/// Issues exactly one HTTP call per invocation
///
/// Implementations never retry and never sleep. Interpreting the status or
/// body is left to the provider adapter and retry policy above.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send `request` and return the parsed response
    async fn call(&self, request: &TransportRequest) -> Result<TransportResponse>;
}

/// A single REST or GraphQL-over-HTTP call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransportRequest {
    /// HTTP method
    pub method: Method,
    /// Path relative to the transport's base URL, or an absolute URL
    pub path: String,
    /// Query parameters in send order
    pub query: Vec<(String, String)>,
    /// Extra request headers
    pub headers: Vec<(String, String)>,
    /// JSON body
    pub body: Option<JsonValue>,
}

impl TransportRequest {
    /// A GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            ..Self::default()
        }
    }

    /// A POST request with a JSON body
    pub fn post(path: impl Into<String>, body: JsonValue) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
            ..Self::default()
        }
    }

    /// A GraphQL request (`{"query": ..., "variables": ...}`)
    pub fn graphql(path: impl Into<String>, query: &str, variables: JsonValue) -> Self {
        Self::post(path, json!({ "query": query, "variables": variables }))
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Value of a query parameter, if present
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// GraphQL variables, if this is a GraphQL request
    pub fn variables(&self) -> Option<&JsonValue> {
        self.body.as_ref().and_then(|b| b.get("variables"))
    }

    /// Short description for logs and error context
    pub fn describe(&self) -> String {
        let mut out = format!("{} {}", self.method, self.path);
        if !self.query.is_empty() {
            let qs: Vec<String> = self.query.iter().map(|(k, v)| format!("{k}={v}")).collect();
            out.push('?');
            out.push_str(&qs.join("&"));
        }
        if let Some(vars) = self.variables() {
            out.push_str(&format!(" variables={vars}"));
        }
        out
    }
}

/// Status, headers and parsed body of one call
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Parsed JSON body (`String` for non-JSON bodies, `Null` when empty)
    pub body: JsonValue,
}

impl TransportResponse {
    /// Create a response with no headers
    pub fn new(status: u16, body: JsonValue) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Add a header (for tests and adapters)
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    /// Header value as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// True for 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body rendered as text
    pub fn body_text(&self) -> String {
        match &self.body {
            JsonValue::String(s) => s.clone(),
            JsonValue::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Diagnostic context for `request`
    pub fn context(&self, request: &TransportRequest) -> ResponseContext {
        ResponseContext::new(request.describe(), self.status, self.body_text())
    }

    /// Build a malformed-response error for this response
    pub fn malformed(&self, request: &TransportRequest, message: impl Into<String>) -> Error {
        Error::malformed(message, self.context(request))
    }
}

/// Parse a response body: JSON when possible, raw text otherwise
pub(crate) fn parse_body(text: &str) -> JsonValue {
    if text.trim().is_empty() {
        return JsonValue::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| JsonValue::String(text.to_string()))
}
