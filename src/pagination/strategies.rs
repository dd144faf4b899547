//! Pagination strategy implementations

use super::types::{non_empty, Paginator};
use crate::decode::{lookup, lookup_string};
use reqwest::header::HeaderMap;
use serde_json::Value;

// ============================================================================
// No Pagination
// ============================================================================

/// Single request, no pagination
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPaginator;

impl Paginator for NoPaginator {
    fn next_cursor(&self, _body: &Value, _headers: &HeaderMap) -> Option<String> {
        None
    }
}

// ============================================================================
// Body Cursor Pagination
// ============================================================================

/// Cursor read from the response body
#[derive(Debug, Clone)]
pub struct BodyCursorPaginator {
    /// Path to the next cursor
    pub cursor_path: String,
    /// Path to a boolean "has more" flag
    pub has_more_path: Option<String>,
    /// Query parameter to read when the cursor is a next-page URL
    pub url_param: Option<String>,
}

impl BodyCursorPaginator {
    /// Create a new body cursor paginator
    pub fn new(cursor_path: impl Into<String>, has_more_path: Option<String>) -> Self {
        Self {
            cursor_path: cursor_path.into(),
            has_more_path,
            url_param: None,
        }
    }

    /// Treat the cursor as a URL and read `param` from its query
    #[must_use]
    pub fn url_param(mut self, param: Option<String>) -> Self {
        self.url_param = param;
        self
    }
}

impl Paginator for BodyCursorPaginator {
    fn next_cursor(&self, body: &Value, _headers: &HeaderMap) -> Option<String> {
        if let Some(path) = &self.has_more_path {
            if lookup(body, path).and_then(Value::as_bool) == Some(false) {
                return None;
            }
        }
        let cursor = non_empty(lookup_string(body, &self.cursor_path))?;
        match &self.url_param {
            Some(param) => non_empty(query_param(&cursor, param)),
            None => Some(cursor),
        }
    }
}

// ============================================================================
// GraphQL Connection Pagination
// ============================================================================

/// Relay-style `pageInfo { hasNextPage endCursor }`
#[derive(Debug, Clone)]
pub struct GraphQlConnectionPaginator {
    /// Path to the connection object
    pub connection_path: String,
}

impl GraphQlConnectionPaginator {
    /// Create a new connection paginator
    pub fn new(connection_path: impl Into<String>) -> Self {
        Self {
            connection_path: connection_path.into(),
        }
    }
}

impl Paginator for GraphQlConnectionPaginator {
    fn next_cursor(&self, body: &Value, _headers: &HeaderMap) -> Option<String> {
        let page_info = lookup(body, &self.connection_path)?.get("pageInfo")?;

        if page_info.get("hasNextPage").and_then(Value::as_bool) != Some(true) {
            return None;
        }
        non_empty(
            page_info
                .get("endCursor")
                .and_then(Value::as_str)
                .map(str::to_string),
        )
    }
}

// ============================================================================
// Link Header Pagination
// ============================================================================

/// Link header pagination (RFC 5988); the cursor is a query parameter of
/// the `rel="next"` URL
#[derive(Debug, Clone)]
pub struct LinkHeaderPaginator {
    /// Rel value to follow (default: "next")
    pub rel: String,
    /// Query parameter carrying the cursor (default: "page_info")
    pub cursor_param: String,
}

impl Default for LinkHeaderPaginator {
    fn default() -> Self {
        Self {
            rel: "next".to_string(),
            cursor_param: "page_info".to_string(),
        }
    }
}

impl LinkHeaderPaginator {
    /// Create a new link header paginator
    pub fn new(rel: impl Into<String>, cursor_param: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            cursor_param: cursor_param.into(),
        }
    }
}

impl Paginator for LinkHeaderPaginator {
    fn next_cursor(&self, _body: &Value, headers: &HeaderMap) -> Option<String> {
        let link_header = headers.get("link").and_then(|v| v.to_str().ok())?;
        let next_url = parse_link_header(link_header, &self.rel)?;
        non_empty(query_param(&next_url, &self.cursor_param))
    }
}

/// Value of `param` in the query of an absolute URL
fn query_param(url: &str, param: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == param)
        .map(|(_, v)| v.into_owned())
}

/// Parse a Link header and extract the URL for the given rel
pub(crate) fn parse_link_header(header: &str, target_rel: &str) -> Option<String> {
    // Link header format: <url>; rel="next", <url>; rel="prev"
    for part in header.split(',') {
        let part = part.trim();
        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(stripped) = segment.strip_prefix("rel=") {
                rel = Some(stripped.trim_matches('"').trim_matches('\''));
            }
        }

        if let (Some(u), Some(r)) = (url, rel) {
            if r == target_rel {
                return Some(u.to_string());
            }
        }
    }

    None
}
