//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by all strategies.

use super::strategies::{
    BodyCursorPaginator, GraphQlConnectionPaginator, LinkHeaderPaginator, NoPaginator,
};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Configuration for pagination behavior
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaginationConfig {
    /// Single page
    #[default]
    None,

    /// Cursor in the response body (e.g. Faire `cursor`)
    BodyCursor {
        /// Path to the next cursor
        cursor_path: String,
        /// Optional path to a "has more" flag
        #[serde(default)]
        has_more_path: Option<String>,
        /// When the cursor is a full next-page URL (e.g. Loop Returns
        /// `nextPageUrl`), the query parameter of that URL to use instead
        #[serde(default)]
        url_param: Option<String>,
    },

    /// Relay connection `pageInfo { hasNextPage endCursor }`
    GraphqlConnection {
        /// Path to the connection object (e.g. `data.orders`)
        connection_path: String,
    },

    /// RFC 5988 Link header whose next URL carries the cursor
    LinkHeader {
        /// Rel value to follow
        #[serde(default = "default_rel")]
        rel: String,
        /// Query parameter of the next URL holding the cursor
        #[serde(default = "default_link_cursor_param")]
        cursor_param: String,
    },
}

fn default_rel() -> String {
    "next".to_string()
}

fn default_link_cursor_param() -> String {
    "page_info".to_string()
}

impl PaginationConfig {
    /// Body cursor pagination
    pub fn body_cursor(cursor_path: impl Into<String>) -> Self {
        Self::BodyCursor {
            cursor_path: cursor_path.into(),
            has_more_path: None,
            url_param: None,
        }
    }

    /// GraphQL connection pagination
    pub fn graphql_connection(connection_path: impl Into<String>) -> Self {
        Self::GraphqlConnection {
            connection_path: connection_path.into(),
        }
    }

    /// Link header pagination with Shopify defaults
    pub fn link_header() -> Self {
        Self::LinkHeader {
            rel: default_rel(),
            cursor_param: default_link_cursor_param(),
        }
    }

    /// Build the paginator
    pub fn build(&self) -> Arc<dyn Paginator> {
        match self {
            PaginationConfig::None => Arc::new(NoPaginator),
            PaginationConfig::BodyCursor {
                cursor_path,
                has_more_path,
                url_param,
            } => Arc::new(
                BodyCursorPaginator::new(cursor_path.clone(), has_more_path.clone())
                    .url_param(url_param.clone()),
            ),
            PaginationConfig::GraphqlConnection { connection_path } => {
                Arc::new(GraphQlConnectionPaginator::new(connection_path.clone()))
            }
            PaginationConfig::LinkHeader { rel, cursor_param } => {
                Arc::new(LinkHeaderPaginator::new(rel.clone(), cursor_param.clone()))
            }
        }
    }
}

/// Whether filter parameters may be sent together with a cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorRule {
    /// Every call sends the filters, plus the cursor when there is one
    #[default]
    Combined,
    /// Filters go out on the first call only; later calls send just the
    /// cursor and page size (the provider rejects both together)
    Exclusive,
}

/// Extracts the next cursor from a response
pub trait Paginator: Send + Sync + std::fmt::Debug {
    /// The cursor for the next page, or `None` when this was the last page
    fn next_cursor(&self, body: &Value, headers: &HeaderMap) -> Option<String>;
}

/// Empty cursors mean "no more pages"
pub(crate) fn non_empty(cursor: Option<String>) -> Option<String> {
    cursor.filter(|c| !c.trim().is_empty())
}
