//! Document ingestion pipeline: PDF -> text -> chunks -> embeddings ->
//! document store.

use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use super::chunker::{chunk_text, ChunkerConfig};
use crate::core::errors::ApiError;
use crate::embed::EmbeddingBackend;
use crate::store::{DocumentStore, EmbeddedChunk};

pub struct DocumentIngestor {
    chunker: ChunkerConfig,
    embedding_dim: usize,
    embedder: Arc<dyn EmbeddingBackend>,
    store: Arc<dyn DocumentStore>,
}

impl DocumentIngestor {
    pub fn new(
        chunker: ChunkerConfig,
        embedding_dim: usize,
        embedder: Arc<dyn EmbeddingBackend>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            chunker,
            embedding_dim,
            embedder,
            store,
        }
    }

    /// Ingest one PDF. Returns the number of chunks stored; zero means
    /// the document contained no extractable text, which is not an
    /// error.
    pub async fn ingest_pdf(&self, path: &Path, display_name: &str) -> Result<usize, ApiError> {
        let text = pdf_extract::extract_text(path)
            .map_err(|e| ApiError::Internal(format!("failed to extract PDF text: {e}")))?;

        self.ingest_text(&text, display_name).await
    }

    pub async fn ingest_text(&self, text: &str, display_name: &str) -> Result<usize, ApiError> {
        let chunks = chunk_text(text, &self.chunker);
        if chunks.is_empty() {
            tracing::info!(file = %display_name, "Document contained no text; nothing to ingest");
            return Ok(0);
        }

        let embeddings = self.embedder.embed(&chunks).await?;

        for embedding in &embeddings {
            if embedding.len() != self.embedding_dim {
                return Err(ApiError::Internal(format!(
                    "embedding dimension {} does not match index dimension {}",
                    embedding.len(),
                    self.embedding_dim
                )));
            }
        }

        let records: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| EmbeddedChunk {
                id: Uuid::new_v4().to_string(),
                text,
                source_file: display_name.to_string(),
                embedding,
            })
            .collect();

        let count = records.len();
        self.store.upsert(records).await?;

        tracing::info!(file = %display_name, chunks = count, "Ingested document");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::store::SearchHit;

    struct FakeEmbedder {
        dim: usize,
    }

    #[async_trait]
    impl EmbeddingBackend for FakeEmbedder {
        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(inputs.iter().map(|_| vec![0.5; self.dim]).collect())
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        upserted: Mutex<Vec<EmbeddedChunk>>,
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn upsert(&self, chunks: Vec<EmbeddedChunk>) -> Result<(), ApiError> {
            self.upserted.lock().unwrap().extend(chunks);
            Ok(())
        }

        async fn query(
            &self,
            _vector: &[f32],
            _top_k: usize,
            _source_file: Option<&str>,
        ) -> Result<Vec<SearchHit>, ApiError> {
            Ok(vec![])
        }
    }

    fn ingestor(dim: usize, store: Arc<RecordingStore>) -> DocumentIngestor {
        DocumentIngestor::new(
            ChunkerConfig::new(500, 100).unwrap(),
            dim,
            Arc::new(FakeEmbedder { dim }),
            store,
        )
    }

    #[tokio::test]
    async fn empty_text_is_a_no_op() {
        let store = Arc::new(RecordingStore::default());
        let count = ingestor(4, store.clone())
            .ingest_text("", "empty.pdf")
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(store.upserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn chunks_carry_source_and_unique_ids() {
        let store = Arc::new(RecordingStore::default());
        let text = "z".repeat(1200);
        let count = ingestor(4, store.clone())
            .ingest_text(&text, "notes.pdf")
            .await
            .unwrap();

        assert_eq!(count, 3);
        let stored = store.upserted.lock().unwrap();
        assert!(stored.iter().all(|c| c.source_file == "notes.pdf"));
        let mut ids: Vec<&str> = stored.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let store = Arc::new(RecordingStore::default());
        let ingestor = DocumentIngestor::new(
            ChunkerConfig::new(500, 100).unwrap(),
            384,
            Arc::new(FakeEmbedder { dim: 8 }),
            store.clone(),
        );

        let result = ingestor.ingest_text("some text", "bad.pdf").await;
        assert!(result.is_err());
        assert!(store.upserted.lock().unwrap().is_empty());
    }
}
