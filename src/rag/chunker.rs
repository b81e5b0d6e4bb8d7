//! Fixed-size overlapping text chunking.
//!
//! Purely offset-based over characters; sentence and paragraph
//! boundaries are ignored on purpose.

use serde::{Deserialize, Serialize};

use crate::core::config::AppConfig;
use crate::core::errors::ApiError;

/// Validated chunking parameters. Fields stay private so a config with
/// `overlap >= chunk_size` cannot exist; `new` is the only way in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum chunk size in characters.
    chunk_size: usize,
    /// Overlap between consecutive chunks, in characters.
    overlap: usize,
}

impl ChunkerConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ApiError> {
        if chunk_size <= overlap {
            return Err(ApiError::Configuration(format!(
                "chunk_size ({chunk_size}) must be greater than overlap ({overlap})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, ApiError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

/// Split `text` into overlapping windows.
///
/// The cursor starts at 0; each step emits
/// `text[cursor..min(cursor + chunk_size, len)]` and advances by
/// `chunk_size - overlap`. Non-empty input yields at least one chunk;
/// empty input yields none — the caller treats that as "nothing to
/// ingest", not an error.
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let step = config.chunk_size - config.overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + config.chunk_size).min(total);
        chunks.push(chars[start..end].iter().collect());
        start += step;
    }

    chunks
}
