//! Record sinks
//!
//! Where flattened rows go after each page.

use super::manifest::Manifest;
use super::schema::json_to_arrow;
use super::writer::{write_batch_to_parquet, ParquetWriterConfig};
use crate::engine::StreamReport;
use crate::error::{Error, Result};
use crate::flatten::{EntityInfo, EntitySchema, FlatRecord};
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Destination for flattened rows of one stream at a time
pub trait RecordSink: Send {
    /// Prepare for a stream; called once before its first page
    fn begin(&mut self, _stream: &str, _schema: &EntitySchema) -> Result<()> {
        Ok(())
    }

    /// Accept the rows of one page
    fn write(&mut self, records: &[FlatRecord]) -> Result<()>;

    /// The stream ended, successfully or not
    fn finish(&mut self, report: &StreamReport) -> Result<()>;

    /// Record a stream that was never started; existing files are left alone
    fn skip(&mut self, report: &StreamReport, schema: &EntitySchema) -> Result<()>;
}

/// File format for [`open_sink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Jsonl,
    Parquet,
}

impl OutputFormat {
    /// File extension
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jsonl => "jsonl",
            OutputFormat::Parquet => "parquet",
        }
    }
}

/// Open a file sink writing under `<root>/<source>/`
pub fn open_sink(format: OutputFormat, root: &Path, source: &str) -> Result<Box<dyn RecordSink>> {
    Ok(match format {
        OutputFormat::Jsonl => Box::new(JsonlSink::new(root, source)?),
        OutputFormat::Parquet => Box::new(ParquetSink::new(root, source)?),
    })
}

fn record_skipped(
    dir: &Path,
    source: &str,
    format: &str,
    report: &StreamReport,
    schema: &EntitySchema,
) -> Result<()> {
    let mut manifest = Manifest::load_or_new(dir, source, format)?;
    manifest.record(report, &schema.entities(), format);
    manifest.save(dir)?;
    info!(source, stream = %report.stream, status = %report.status, "Recorded skipped stream");
    Ok(())
}

fn source_dir(root: &Path, source: &str) -> Result<PathBuf> {
    let dir = root.join(source);
    std::fs::create_dir_all(&dir).map_err(|e| {
        Error::output(format!("Failed to create output dir {}: {e}", dir.display()))
    })?;
    Ok(dir)
}

// ============================================================================
// Memory
// ============================================================================

/// Keeps every row in memory, grouped by entity
#[derive(Debug, Default)]
pub struct MemorySink {
    records: BTreeMap<String, Vec<FlatRecord>>,
    reports: Vec<StreamReport>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of one entity, in write order
    pub fn records(&self, entity: &str) -> &[FlatRecord] {
        self.records.get(entity).map_or(&[][..], Vec::as_slice)
    }

    /// Entities with at least one row
    pub fn entities(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Reports of finished streams
    pub fn reports(&self) -> &[StreamReport] {
        &self.reports
    }
}

impl RecordSink for MemorySink {
    fn write(&mut self, records: &[FlatRecord]) -> Result<()> {
        for record in records {
            self.records
                .entry(record.entity.clone())
                .or_default()
                .push(record.clone());
        }
        Ok(())
    }

    fn finish(&mut self, report: &StreamReport) -> Result<()> {
        self.reports.push(report.clone());
        Ok(())
    }

    fn skip(&mut self, report: &StreamReport, _schema: &EntitySchema) -> Result<()> {
        self.reports.push(report.clone());
        Ok(())
    }
}

// ============================================================================
// JSON Lines
// ============================================================================

/// Appends one `<entity>.jsonl` file per entity, flushed after every page
#[derive(Debug)]
pub struct JsonlSink {
    dir: PathBuf,
    source: String,
    entities: Vec<EntityInfo>,
    files: HashMap<String, BufWriter<File>>,
}

impl JsonlSink {
    /// Sink writing under `<root>/<source>/`
    pub fn new(root: &Path, source: &str) -> Result<Self> {
        Ok(Self {
            dir: source_dir(root, source)?,
            source: source.to_string(),
            entities: Vec::new(),
            files: HashMap::new(),
        })
    }

    /// Directory holding the entity files
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RecordSink for JsonlSink {
    fn begin(&mut self, stream: &str, schema: &EntitySchema) -> Result<()> {
        self.entities = schema.entities();
        self.files.clear();
        for info in &self.entities {
            let path = self.dir.join(format!("{}.jsonl", info.name));
            let file = File::create(&path).map_err(|e| {
                Error::output(format!("Failed to create {}: {e}", path.display()))
            })?;
            self.files.insert(info.name.clone(), BufWriter::new(file));
        }
        debug!(source = %self.source, stream, dir = %self.dir.display(), "Opened JSONL files");
        Ok(())
    }

    fn write(&mut self, records: &[FlatRecord]) -> Result<()> {
        for record in records {
            let file = self.files.get_mut(&record.entity).ok_or_else(|| {
                Error::output(format!("No output file for entity '{}'", record.entity))
            })?;
            serde_json::to_writer(&mut *file, &record.to_json())?;
            file.write_all(b"\n")?;
        }
        for file in self.files.values_mut() {
            file.flush()?;
        }
        Ok(())
    }

    fn finish(&mut self, report: &StreamReport) -> Result<()> {
        for (_, mut file) in self.files.drain() {
            file.flush()?;
        }

        let mut manifest = Manifest::load_or_new(&self.dir, &self.source, "jsonl")?;
        manifest.record(report, &self.entities, "jsonl");
        manifest.save(&self.dir)?;

        info!(
            source = %self.source,
            stream = %report.stream,
            status = %report.status,
            records = report.total_records(),
            dir = %self.dir.display(),
            "Wrote JSONL output"
        );
        Ok(())
    }

    fn skip(&mut self, report: &StreamReport, schema: &EntitySchema) -> Result<()> {
        record_skipped(&self.dir, &self.source, "jsonl", report, schema)
    }
}

// ============================================================================
// Parquet
// ============================================================================

/// Buffers rows per entity and writes `<entity>.parquet` when the stream ends
#[derive(Debug)]
pub struct ParquetSink {
    dir: PathBuf,
    source: String,
    config: ParquetWriterConfig,
    entities: Vec<EntityInfo>,
    buffers: BTreeMap<String, Vec<JsonValue>>,
}

impl ParquetSink {
    /// Sink writing under `<root>/<source>/`
    pub fn new(root: &Path, source: &str) -> Result<Self> {
        Ok(Self {
            dir: source_dir(root, source)?,
            source: source.to_string(),
            config: ParquetWriterConfig::default(),
            entities: Vec::new(),
            buffers: BTreeMap::new(),
        })
    }

    /// Directory holding the entity files
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RecordSink for ParquetSink {
    fn begin(&mut self, _stream: &str, schema: &EntitySchema) -> Result<()> {
        self.entities = schema.entities();
        self.buffers = self
            .entities
            .iter()
            .map(|info| (info.name.clone(), Vec::new()))
            .collect();
        Ok(())
    }

    fn write(&mut self, records: &[FlatRecord]) -> Result<()> {
        for record in records {
            let buffer = self.buffers.get_mut(&record.entity).ok_or_else(|| {
                Error::output(format!("No output buffer for entity '{}'", record.entity))
            })?;
            buffer.push(record.to_json());
        }
        Ok(())
    }

    fn finish(&mut self, report: &StreamReport) -> Result<()> {
        for (entity, rows) in std::mem::take(&mut self.buffers) {
            let path = self.dir.join(format!("{entity}.parquet"));
            if rows.is_empty() {
                if path.exists() {
                    std::fs::remove_file(&path)?;
                }
                continue;
            }
            let batch = json_to_arrow(&rows)?;
            let written = write_batch_to_parquet(&path, &batch, &self.config)?;
            debug!(entity = %entity, rows = written, path = %path.display(), "Wrote Parquet file");
        }

        let mut manifest = Manifest::load_or_new(&self.dir, &self.source, "parquet")?;
        manifest.record(report, &self.entities, "parquet");
        manifest.save(&self.dir)?;

        info!(
            source = %self.source,
            stream = %report.stream,
            status = %report.status,
            records = report.total_records(),
            dir = %self.dir.display(),
            "Wrote Parquet output"
        );
        Ok(())
    }

    fn skip(&mut self, report: &StreamReport, schema: &EntitySchema) -> Result<()> {
        record_skipped(&self.dir, &self.source, "parquet", report, schema)
    }
}
