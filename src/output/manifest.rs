//! Output manifest
//!
//! `_manifest.json` tells the load pipeline how the entity files of a source
//! relate: primary key, foreign key and parent of each entity, plus how each
//! stream ended.

use crate::engine::{StreamReport, StreamStatus};
use crate::error::{Error, Result};
use crate::flatten::EntityInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Manifest file name inside a source directory
pub const MANIFEST_FILE: &str = "_manifest.json";

/// Per-source manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub source: String,
    pub format: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub streams: BTreeMap<String, StreamEntry>,
}

/// One stream's entry in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEntry {
    pub status: StreamStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub pages: u64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub entities: Vec<EntityEntry>,
}

/// One entity file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEntry {
    pub name: String,
    pub file: String,
    pub primary_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub rows: u64,
}

impl Manifest {
    /// Path of the manifest inside `dir`
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    /// Load the manifest in `dir`, or start a new one
    pub fn load_or_new(dir: &Path, source: &str, format: &str) -> Result<Self> {
        let path = Self::path(dir);
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let manifest: Manifest = serde_json::from_str(&content)?;
            if manifest.format == format {
                return Ok(manifest);
            }
        }
        Ok(Self {
            source: source.to_string(),
            format: format.to_string(),
            updated_at: Utc::now(),
            streams: BTreeMap::new(),
        })
    }

    /// Record how a stream ended, replacing any earlier entry for it
    pub fn record(&mut self, report: &StreamReport, entities: &[EntityInfo], extension: &str) {
        let entities = entities
            .iter()
            .map(|info| EntityEntry {
                name: info.name.clone(),
                file: format!("{}.{extension}", info.name),
                primary_key: info.primary_key.clone(),
                foreign_key: info.foreign_key.clone(),
                parent: info.parent.clone(),
                rows: report.records_for(&info.name),
            })
            .collect();

        self.streams.insert(
            report.stream.clone(),
            StreamEntry {
                status: report.status,
                error: report.error.clone(),
                pages: report.pages,
                started_at: report.started_at,
                duration_ms: report.duration_ms,
                entities,
            },
        );
        self.updated_at = Utc::now();
    }

    /// Write the manifest to `dir`, replacing the old one atomically
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = Self::path(dir);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp, content)
            .and_then(|()| std::fs::rename(&tmp, &path))
            .map_err(|e| Error::output(format!("Failed to write {}: {e}", path.display())))
    }
}
