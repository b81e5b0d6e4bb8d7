//! DocumentStore trait — abstract interface for the chunk index.
//!
//! Two backends implement it: `MilvusDocStore` (remote, explicit
//! schema/index/load) and `SqliteDocStore` (embedded, auto-creating).

mod milvus;
mod sqlite;

pub use milvus::MilvusDocStore;
pub use sqlite::SqliteDocStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// One chunk of an ingested document together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    /// Unique chunk identifier, assigned at ingestion.
    pub id: String,
    /// The raw characters of the slice.
    pub text: String,
    /// Display name of the originating upload. Not unique: ingesting
    /// the same file twice stores two chunk sets under the same name.
    pub source_file: String,
    /// Fixed-dimension embedding produced by the embedding backend.
    pub embedding: Vec<f32>,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    pub source_file: String,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

/// Abstract interface over the vector store backends.
///
/// The ordering contract is shared: hits come back in decreasing
/// similarity order, ties broken arbitrarily; fewer than `top_k` hits
/// only when the (filtered) index holds fewer records in total.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a batch of chunks. Implementations must await store-side
    /// flushing before returning so a following query can see the batch.
    async fn upsert(&self, chunks: Vec<EmbeddedChunk>) -> Result<(), ApiError>;

    /// Nearest-neighbour search by cosine similarity, optionally scoped
    /// to a single source file. An empty index yields an empty vec.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        source_file: Option<&str>,
    ) -> Result<Vec<SearchHit>, ApiError>;
}
