//! Output module
//!
//! Hands flattened rows to the load pipeline.
//!
//! # Overview
//!
//! - [`RecordSink`]: page-by-page destination for one stream at a time
//! - [`JsonlSink`] / [`ParquetSink`]: one file per entity under
//!   `<dir>/<source>/`, plus `_manifest.json`
//! - [`MemorySink`]: in-process collection

mod manifest;
mod schema;
mod sinks;
mod writer;

pub use manifest::{EntityEntry, Manifest, StreamEntry, MANIFEST_FILE};
pub use schema::{infer_schema, json_to_arrow};
pub use sinks::{open_sink, JsonlSink, MemorySink, OutputFormat, ParquetSink, RecordSink};
pub use writer::{write_batch_to_parquet, ParquetWriterConfig};
