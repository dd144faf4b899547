//! CLI commands and argument parsing

use crate::output::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Rate-adaptive paginated extraction for commerce APIs
#[derive(Parser, Debug)]
#[command(name = "culk-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON) providing `{{ config.x }}` values
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Inline config JSON; takes precedence over --config
    #[arg(long, global = true)]
    pub config_json: Option<String>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract streams and write them to the output directory
    Run {
        /// Built-in source name or YAML path; repeat for several sources
        #[arg(short, long = "source", required = true)]
        sources: Vec<String>,

        /// Streams to extract (repeatable, default: all)
        #[arg(long = "stream")]
        streams: Vec<String>,

        /// Start of the updated-since window (YYYY-MM-DD, RFC 3339 or Unix seconds)
        #[arg(long)]
        since: Option<String>,

        /// Output directory; each source writes to `<output>/<source>/`
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Output file format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Jsonl)]
        format: OutputFormat,

        /// Stop each stream after this many pages
        #[arg(long)]
        max_pages: Option<u64>,
    },

    /// Fetch one page per source to verify credentials and reachability
    Check {
        /// Built-in source name or YAML path; repeat for several sources
        #[arg(short, long = "source", required = true)]
        sources: Vec<String>,

        /// Stream to probe (default: the first stream)
        #[arg(long)]
        stream: Option<String>,
    },

    /// Validate source definitions without network access
    Validate {
        /// Built-in source name or YAML path; repeat for several sources
        #[arg(short, long = "source", required = true)]
        sources: Vec<String>,
    },

    /// List built-in sources
    List,
}
