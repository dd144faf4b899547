//! Decoder types and traits

use super::decoders::JsonDecoder;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration for extracting records from a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Path to the records (dot notation or JSONPath with wildcards)
    #[serde(default)]
    pub record_path: Option<String>,
    /// Unwrap Relay `{"node": {...}}` edges
    #[serde(default = "default_true")]
    pub unwrap_node: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            record_path: None,
            unwrap_node: true,
        }
    }
}

impl DecoderConfig {
    /// Config with a record path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            record_path: Some(path.into()),
            unwrap_node: true,
        }
    }

    /// Build the decoder
    pub fn build(&self) -> JsonDecoder {
        let decoder = match &self.record_path {
            Some(path) => JsonDecoder::with_path(path.clone()),
            None => JsonDecoder::new(),
        };
        decoder.unwrap_node(self.unwrap_node)
    }
}

/// Extracts records from a parsed response body
pub trait RecordDecoder: Send + Sync + std::fmt::Debug {
    /// Decode records from the body
    fn decode(&self, body: &Value) -> Result<Vec<Value>>;
}
