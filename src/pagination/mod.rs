//! Pagination module
//!
//! Supports: Body cursor, GraphQL connection (`pageInfo`), Link header
//!
//! # Overview
//!
//! A [`Paginator`] reads the next cursor from a response; a
//! [`PageRequestBuilder`] turns the cursor back into the next request,
//! honouring the source's [`CursorRule`].

mod request;
mod strategies;
mod types;

pub use request::{PageRequestBuilder, RequestTemplate};
pub use strategies::{
    BodyCursorPaginator, GraphQlConnectionPaginator, LinkHeaderPaginator, NoPaginator,
};
pub use types::{CursorRule, PaginationConfig, Paginator};
