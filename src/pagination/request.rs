//! Per-page request shaping
//!
//! [`PageRequestBuilder`] turns `(first_call, cursor)` into the request for
//! one page, applying the source's [`CursorRule`].

use super::types::CursorRule;
use crate::http::TransportRequest;
use crate::types::{JsonObject, JsonValue};

/// What the request for every page is built from
#[derive(Debug, Clone, PartialEq)]
pub enum RequestTemplate {
    /// REST GET with query parameters
    Rest {
        /// Endpoint path
        path: String,
        /// Parameters sent with the first page (and every page under
        /// [`CursorRule::Combined`])
        params: Vec<(String, String)>,
    },
    /// GraphQL POST with variables
    Graphql {
        /// Endpoint path
        path: String,
        /// Query document
        query: String,
        /// Variables sent with the first page (and every page under
        /// [`CursorRule::Combined`])
        variables: JsonObject,
    },
}

/// Builds the request for each page of a stream
#[derive(Debug, Clone)]
pub struct PageRequestBuilder {
    template: RequestTemplate,
    cursor_param: String,
    page_size: Option<(String, u32)>,
    filters: Vec<(String, String)>,
    rule: CursorRule,
}

impl PageRequestBuilder {
    /// Create a builder sending the cursor as `cursor_param`
    pub fn new(template: RequestTemplate, cursor_param: impl Into<String>) -> Self {
        Self {
            template,
            cursor_param: cursor_param.into(),
            page_size: None,
            filters: Vec::new(),
            rule: CursorRule::default(),
        }
    }

    /// Send a page size on every call
    #[must_use]
    pub fn page_size(mut self, param: impl Into<String>, size: u32) -> Self {
        self.page_size = Some((param.into(), size));
        self
    }

    /// Add an initial filter (e.g. an "updated since" timestamp)
    #[must_use]
    pub fn filter(mut self, param: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((param.into(), value.into()));
        self
    }

    /// Set the cursor rule
    #[must_use]
    pub fn cursor_rule(mut self, rule: CursorRule) -> Self {
        self.rule = rule;
        self
    }


    /// Build the request for one page
    ///
    /// `first_call` is tracked by the caller separately from `cursor`: a
    /// first call may carry a cursor and a later call may carry none.
    pub fn build(&self, first_call: bool, cursor: Option<&str>) -> TransportRequest {
        let send_initial = first_call || self.rule == CursorRule::Combined;

        match &self.template {
            RequestTemplate::Rest { path, params } => {
                let mut request = TransportRequest::get(path.clone());
                if send_initial {
                    for (k, v) in params.iter().chain(&self.filters) {
                        request = request.query(k.clone(), v.clone());
                    }
                }
                if let Some((param, size)) = &self.page_size {
                    request = request.query(param.clone(), size.to_string());
                }
                if let Some(cursor) = cursor {
                    request = request.query(self.cursor_param.clone(), cursor);
                }
                request
            }
            RequestTemplate::Graphql {
                path,
                query,
                variables,
            } => {
                let mut vars = JsonObject::new();
                if send_initial {
                    vars.extend(variables.clone());
                    for (k, v) in &self.filters {
                        vars.insert(k.clone(), JsonValue::String(v.clone()));
                    }
                }
                if let Some((param, size)) = &self.page_size {
                    vars.insert(param.clone(), JsonValue::from(*size));
                }
                if let Some(cursor) = cursor {
                    vars.insert(
                        self.cursor_param.clone(),
                        JsonValue::String(cursor.to_string()),
                    );
                }
                TransportRequest::graphql(path.clone(), query, JsonValue::Object(vars))
            }
        }
    }
}
