//! YAML Loader module
//!
//! Parse source definitions from YAML files and prepare them for fetching.
//!
//! # Overview
//!
//! The loader module provides:
//! - `SourceDefinition` - Declarative source specification
//! - `StreamDefinition` - Stream configuration
//! - `Source` - A rendered definition that builds per-stream fetchers
//! - YAML parsing with validation

mod builder;
mod parser;
mod types;

pub use builder::{FetchOptions, Source};
pub use parser::{load_source, load_source_from_str};
pub use types::{
    AuthDefinition, HttpDefinition, IncrementalDefinition, PageSizeDefinition,
    RequestDefinition, SourceDefinition, StreamDefinition,
};

#[cfg(test)]
mod tests;
