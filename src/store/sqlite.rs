//! SQLite-backed document store.
//!
//! Embedded alternative to Milvus: the table is created on open, no
//! explicit index build or load step, and search is brute-force cosine
//! similarity over the stored embeddings.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::{DocumentStore, EmbeddedChunk, SearchHit};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

pub struct SqliteDocStore {
    pool: SqlitePool,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl SqliteDocStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.store_db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| ApiError::StoreUnavailable(e.to_string()))?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS pdf_chunks (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                source_file TEXT NOT NULL DEFAULT '',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON pdf_chunks(source_file)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocStore {
    async fn upsert(&self, chunks: Vec<EmbeddedChunk>) -> Result<(), ApiError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let count = chunks.len();
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for chunk in &chunks {
            let blob = Self::serialize_embedding(&chunk.embedding);
            sqlx::query(
                "INSERT OR REPLACE INTO pdf_chunks (id, text, source_file, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&chunk.id)
            .bind(&chunk.text)
            .bind(&chunk.source_file)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        // Committing the transaction is the flush: a query on the same
        // pool sees the batch afterwards.
        tx.commit().await.map_err(ApiError::internal)?;
        tracing::debug!("Inserted {} chunks into document store", count);
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        source_file: Option<&str>,
    ) -> Result<Vec<SearchHit>, ApiError> {
        let rows = if let Some(source) = source_file {
            sqlx::query(
                "SELECT text, source_file, embedding FROM pdf_chunks WHERE source_file = ?1",
            )
            .bind(source)
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?
        } else {
            sqlx::query("SELECT text, source_file, embedding FROM pdf_chunks")
                .fetch_all(&self.pool)
                .await
                .map_err(ApiError::internal)?
        };

        let mut scored: Vec<SearchHit> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&embedding_bytes);
                Some(SearchHit {
                    text: row.get("text"),
                    source_file: row.get("source_file"),
                    score: Self::cosine_similarity(vector, &stored),
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteDocStore {
        let tmp = std::env::temp_dir().join(format!("docchat-test-{}.db", uuid::Uuid::new_v4()));
        SqliteDocStore::with_path(tmp).await.unwrap()
    }

    fn chunk(id: &str, text: &str, source: &str, embedding: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            id: id.to_string(),
            text: text.to_string(),
            source_file: source.to_string(),
            embedding,
        }
    }

    #[tokio::test]
    async fn round_trip_returns_all_chunks() {
        let store = test_store().await;

        store
            .upsert(vec![
                chunk("c1", "alpha", "doc.pdf", vec![1.0, 0.0, 0.0]),
                chunk("c2", "beta", "doc.pdf", vec![0.0, 1.0, 0.0]),
                chunk("c3", "gamma", "doc.pdf", vec![0.0, 0.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = store.query(&[1.0, 0.0, 0.0], 10, None).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].text, "alpha");
        assert!(hits[0].score > 0.99);
    }

    #[tokio::test]
    async fn query_orders_by_descending_similarity() {
        let store = test_store().await;

        store
            .upsert(vec![
                chunk("far", "far", "d", vec![0.0, 1.0]),
                chunk("near", "near", "d", vec![0.9, 0.1]),
                chunk("mid", "mid", "d", vec![0.5, 0.5]),
            ])
            .await
            .unwrap();

        let hits = store.query(&[1.0, 0.0], 3, None).await.unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["near", "mid", "far"]);
        assert!(hits[0].score >= hits[1].score && hits[1].score >= hits[2].score);
    }

    #[tokio::test]
    async fn query_is_idempotent() {
        let store = test_store().await;

        store
            .upsert(vec![
                chunk("a", "a", "d", vec![0.7, 0.3]),
                chunk("b", "b", "d", vec![0.3, 0.7]),
            ])
            .await
            .unwrap();

        let first = store.query(&[1.0, 0.0], 2, None).await.unwrap();
        let second = store.query(&[1.0, 0.0], 2, None).await.unwrap();
        let ids = |hits: &[SearchHit]| hits.iter().map(|h| h.text.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn empty_index_returns_empty() {
        let store = test_store().await;
        let hits = store.query(&[1.0, 0.0], 3, None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn source_file_filter_scopes_results() {
        let store = test_store().await;

        store
            .upsert(vec![
                chunk("c1", "mine", "mine.pdf", vec![1.0, 0.0]),
                chunk("c2", "theirs", "theirs.pdf", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = store.query(&[1.0, 0.0], 10, Some("mine.pdf")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "mine");
    }
}
