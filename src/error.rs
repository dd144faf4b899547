//! Error types for culk-ingest
//!
//! This module defines the error taxonomy for the whole crate. Retryable
//! kinds (network, rate limit, transient server errors) are absorbed by the
//! retry policy; everything else terminates the current fetch.

use std::time::Duration;
use thiserror::Error;

/// Maximum number of body bytes kept in a [`ResponseContext`]
const BODY_PREVIEW_LEN: usize = 2048;

/// Request/response context preserved for diagnosis of fatal payload errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseContext {
    /// Short description of the request (method, URL, operation)
    pub request: String,
    /// HTTP status of the response
    pub status: u16,
    /// Bounded preview of the response body
    pub body: String,
}

impl ResponseContext {
    /// Build a context, truncating the body preview
    pub fn new(request: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > BODY_PREVIEW_LEN {
            let mut cut = BODY_PREVIEW_LEN;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
            body.push_str("...");
        }
        Self {
            request: request.into(),
            status,
            body,
        }
    }
}

impl std::fmt::Display for ResponseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}: {}", self.request, self.status, self.body)
    }
}

/// The main error type for culk-ingest
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Transport Errors (retryable)
    // ============================================================================
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Rate limited: {message}")]
    RateLimited {
        /// Wait suggested by the provider, if any
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    // ============================================================================
    // Fatal Response Errors
    // ============================================================================
    #[error("Authentication failed{}, needs re-authentication: {message}", status_suffix(.status))]
    Authentication { status: Option<u16>, message: String },

    #[error("Token refresh failed: {message}")]
    TokenRefresh { message: String },

    #[error("Malformed response: {message} [{context}]")]
    MalformedResponse {
        message: String,
        context: Box<ResponseContext>,
    },

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    ExhaustedRetries { attempts: u32, last: Box<Error> },

    #[error("Fetch cancelled after {pages} pages")]
    Cancelled { pages: u64 },

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("JSONPath error: {message}")]
    JsonPath { message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    // ============================================================================
    // Output Errors
    // ============================================================================
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Output error: {message}")]
    Output { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Authentication {
            status,
            message: message.into(),
        }
    }

    /// Create a rate limit error
    pub fn rate_limited(retry_after: Option<Duration>, message: impl Into<String>) -> Self {
        Self::RateLimited {
            retry_after,
            message: message.into(),
        }
    }

    /// Create a malformed response error with its diagnostic context
    pub fn malformed(message: impl Into<String>, context: ResponseContext) -> Self {
        Self::MalformedResponse {
            message: message.into(),
            context: Box::new(context),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a JSONPath error
    pub fn json_path(message: impl Into<String>) -> Self {
        Self::JsonPath {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network(_)
                | Error::Timeout { .. }
                | Error::RateLimited { .. }
                | Error::ServerError { .. }
        )
    }

    /// Check if this error is a configuration problem (raised before any request)
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::MissingConfigField { .. }
                | Error::InvalidConfigValue { .. }
                | Error::YamlParse(_)
                | Error::UndefinedVariable { .. }
                | Error::InvalidUrl(_)
        )
    }

    /// Short, stable name of the error kind for logs and manifests
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config { .. }
            | Error::MissingConfigField { .. }
            | Error::InvalidConfigValue { .. }
            | Error::YamlParse(_)
            | Error::UndefinedVariable { .. }
            | Error::InvalidUrl(_) => "configuration",
            Error::Network(_) | Error::Timeout { .. } => "network",
            Error::RateLimited { .. } => "rate_limit",
            Error::ServerError { .. } => "server",
            Error::Authentication { .. } | Error::TokenRefresh { .. } => "authentication",
            Error::MalformedResponse { .. } | Error::Decode { .. } | Error::JsonPath { .. } => {
                "malformed_response"
            }
            Error::HttpStatus { .. } => "http_status",
            Error::ExhaustedRetries { .. } => "exhausted_retries",
            Error::Cancelled { .. } => "cancelled",
            Error::JsonParse(_) => "json",
            Error::Arrow(_) | Error::Parquet(_) | Error::Output { .. } | Error::Io(_) => "output",
            Error::Other(_) | Error::Anyhow(_) => "other",
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// Result type alias for culk-ingest
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("access_token");
        assert_eq!(err.to_string(), "Missing required config field: access_token");

        let err = Error::http_status(400, "cursor and updated_at_min are exclusive");
        assert_eq!(
            err.to_string(),
            "HTTP 400: cursor and updated_at_min are exclusive"
        );
    }

    #[test]
    fn test_authentication_display_mentions_reauth() {
        let err = Error::auth(Some(401), "token expired");
        let text = err.to_string();
        assert!(text.contains("401"));
        assert!(text.contains("needs re-authentication"));
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::rate_limited(Some(Duration::from_secs(2)), "throttled").is_retryable());
        assert!(Error::Timeout { timeout_ms: 1000 }.is_retryable());
        assert!(Error::ServerError {
            status: 503,
            body: String::new()
        }
        .is_retryable());

        assert!(!Error::auth(Some(401), "").is_retryable());
        assert!(!Error::auth(Some(403), "").is_retryable());
        assert!(!Error::http_status(400, "").is_retryable());
        assert!(!Error::config("test").is_retryable());
        assert!(!Error::malformed("bad", ResponseContext::new("POST /graphql", 200, "{}"))
            .is_retryable());
        assert!(!Error::ExhaustedRetries {
            attempts: 4,
            last: Box::new(Error::ServerError {
                status: 500,
                body: String::new()
            })
        }
        .is_retryable());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Error::config("x").kind(), "configuration");
        assert_eq!(Error::auth(None, "x").kind(), "authentication");
        assert_eq!(Error::Cancelled { pages: 2 }.kind(), "cancelled");
        assert!(Error::missing_field("x").is_config());
        assert!(!Error::http_status(404, "").is_config());
    }

    #[test]
    fn test_response_context_truncates_body() {
        let body = "x".repeat(BODY_PREVIEW_LEN + 100);
        let ctx = ResponseContext::new("GET /orders", 200, body);
        assert_eq!(ctx.body.len(), BODY_PREVIEW_LEN + 3);
        assert!(ctx.body.ends_with("..."));
    }
}
