//! HTTP transport module
//!
//! Provides the [`Transport`] seam used by the paged fetcher and its
//! reqwest implementation.
//!
//! # Features
//!
//! - **One call per invocation**: no retries or sleeps at this layer
//! - **Parsed bodies**: JSON when possible, raw text otherwise
//! - **Authentication**: Integration with auth module

mod client;
mod request;
mod scripted;

pub use client::{HttpTransport, HttpTransportConfig, HttpTransportConfigBuilder};
pub use request::{Transport, TransportRequest, TransportResponse};
pub use scripted::ScriptedTransport;
