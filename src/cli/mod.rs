//! CLI module
//!
//! Command-line interface for extracting sources.
//!
//! # Commands
//!
//! - `run` - Extract streams to JSONL or Parquet
//! - `check` - Fetch one page to test credentials
//! - `validate` - Check definitions offline
//! - `list` - List built-in sources

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::{RunArgs, Runner};
