// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # culk-ingest
//!
//! Rate-adaptive, cursor-paginated extraction from commerce APIs (Shopify
//! REST and GraphQL, ShipHero GraphQL, Faire, Loop Returns), flattened into
//! parent/child tables for an ELT load pipeline.
//!
//! ## Features
//!
//! - **Rate budgets**: throttle from provider-reported capacity (Shopify
//!   leaky bucket, ShipHero credits) or a fixed delay / request ceiling
//! - **Retry with backoff**: bounded, honoring `Retry-After` hints
//! - **Cursor pagination**: body cursors, Relay connections, Link headers
//! - **Flattening**: nested collections become child tables with foreign keys
//! - **Output**: JSONL or Parquet files plus a manifest per source
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use culk_ingest::engine::ExtractEngine;
//! use culk_ingest::loader::{load_source, FetchOptions, Source};
//! use culk_ingest::output::MemorySink;
//! use culk_ingest::template::TemplateContext;
//!
//! #[tokio::main]
//! async fn main() -> culk_ingest::Result<()> {
//!     let ctx = TemplateContext::from_env(serde_json::json!({"shop": "acme"}));
//!     let source = Source::new(load_source("shopify")?, ctx)?;
//!     let stream = source.definition().stream("orders").unwrap();
//!
//!     let mut sink = MemorySink::new();
//!     let mut engine = ExtractEngine::new(source.name());
//!     let fetcher = source.fetcher(stream, &FetchOptions::default())?;
//!     let report = engine
//!         .run_stream(fetcher, &stream.schema(), &mut sink)
//!         .await
//!         .into_result()?;
//!     println!("{} records", report.total_records());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 PagedFetcher (one per stream)                   │
//! │  budget.before_call → retry(transport.call + classify)          │
//! │  → budget.record → decode → next cursor                         │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │ Page
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │ Provider │  Budget   │   Paginate    │  Flatten  │   Output    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Shopify  │ Fixed     │ Body cursor   │ Parent    │ JSONL       │
//! │ ShipHero │ Ceiling   │ Connection    │ Children  │ Parquet     │
//! │ REST     │ Adaptive  │ Link header   │ Synth ids │ Manifest    │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error taxonomy
pub mod error;

/// Common types and type aliases
pub mod types;

/// Sleeping, swappable in tests
pub mod sleep;

/// Authentication implementations
pub mod auth;

/// HTTP transport
pub mod http;

/// Per-provider response interpretation
pub mod provider;

/// Rate budget tracking
pub mod budget;

/// Retry and backoff
pub mod retry;

/// Cursor extraction and per-page request shaping
pub mod pagination;

/// Record extraction from response bodies
pub mod decode;

/// Cursor-driven paged fetching
pub mod fetch;

/// Nested record flattening
pub mod flatten;

/// JSONL/Parquet output and manifests
pub mod output;

/// Per-stream orchestration
pub mod engine;

/// YAML loader for source definitions
pub mod loader;

/// Template interpolation
pub mod template;

/// Built-in source definitions
pub mod connectors;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use fetch::{Cancellation, Page, PagedFetcher};
pub use loader::{load_source, load_source_from_str, Source, SourceDefinition};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
