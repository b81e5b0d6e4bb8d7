//! Milvus-backed document store over the v2 REST API.
//!
//! Unlike the embedded SQLite backend, Milvus needs an explicit setup
//! sequence before the collection is queryable: declare the schema,
//! build a COSINE index on the vector field, then load the collection.
//! `connect` runs that sequence once at startup.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{DocumentStore, EmbeddedChunk, SearchHit};
use crate::core::config::AppConfig;
use crate::core::errors::ApiError;

const MAX_TEXT_LEN: usize = 2048;
const MAX_SOURCE_LEN: usize = 512;

pub struct MilvusDocStore {
    base_url: String,
    token: Option<String>,
    collection: String,
    dim: usize,
    client: Client,
}

impl MilvusDocStore {
    /// Connect to Milvus and make sure the collection exists, is
    /// indexed and is loaded. Connection or setup failure maps to
    /// `StoreUnavailable`.
    pub async fn connect(config: &AppConfig) -> Result<Self, ApiError> {
        let base_url = config
            .milvus_uri
            .clone()
            .ok_or_else(|| ApiError::Configuration("MILVUS_URI is not set".to_string()))?;

        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(ApiError::internal)?;

        let store = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: config.milvus_token.clone(),
            collection: config.collection_name.clone(),
            dim: config.embedding_dim,
            client,
        };

        store.ensure_collection().await?;
        Ok(store)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        let url = format!("{}/v2/vectordb/{}", self.base_url, path);
        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::StoreUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::StoreUnavailable(format!(
                "milvus {path} returned {status}: {text}"
            )));
        }

        let payload: Value = response.json().await.map_err(ApiError::internal)?;
        let code = payload.get("code").and_then(|v| v.as_i64()).unwrap_or(0);
        if code != 0 {
            return Err(ApiError::StoreUnavailable(format!(
                "milvus {path} error {code}: {}",
                payload
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
            )));
        }

        Ok(payload)
    }

    async fn ensure_collection(&self) -> Result<(), ApiError> {
        let has = self
            .post("collections/has", json!({ "collectionName": self.collection }))
            .await?;
        let exists = has
            .pointer("/data/has")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if exists {
            // Load is idempotent; repeat it so a restarted server can
            // query a collection created by a previous run.
            self.post("collections/load", json!({ "collectionName": self.collection }))
                .await?;
            return Ok(());
        }

        self.post(
            "collections/create",
            json!({
                "collectionName": self.collection,
                "schema": {
                    "autoId": false,
                    "fields": [
                        {
                            "fieldName": "id",
                            "dataType": "VarChar",
                            "isPrimary": true,
                            "elementTypeParams": { "max_length": 36 }
                        },
                        {
                            "fieldName": "embedding",
                            "dataType": "FloatVector",
                            "elementTypeParams": { "dim": self.dim }
                        },
                        {
                            "fieldName": "text",
                            "dataType": "VarChar",
                            "elementTypeParams": { "max_length": MAX_TEXT_LEN }
                        },
                        {
                            "fieldName": "source_file",
                            "dataType": "VarChar",
                            "elementTypeParams": { "max_length": MAX_SOURCE_LEN }
                        }
                    ]
                }
            }),
        )
        .await?;

        self.post(
            "indexes/create",
            json!({
                "collectionName": self.collection,
                "indexParams": [{
                    "fieldName": "embedding",
                    "indexName": "embedding",
                    "metricType": "COSINE",
                    "indexType": "IVF_FLAT",
                    "params": { "nlist": 1024 }
                }]
            }),
        )
        .await?;

        self.post("collections/load", json!({ "collectionName": self.collection }))
            .await?;

        tracing::info!(collection = %self.collection, "Created and loaded Milvus collection");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MilvusDocStore {
    async fn upsert(&self, chunks: Vec<EmbeddedChunk>) -> Result<(), ApiError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let count = chunks.len();
        let rows: Vec<Value> = chunks
            .into_iter()
            .map(|chunk| {
                json!({
                    "id": chunk.id,
                    "embedding": chunk.embedding,
                    "text": truncate_chars(&chunk.text, MAX_TEXT_LEN),
                    "source_file": truncate_chars(&chunk.source_file, MAX_SOURCE_LEN),
                })
            })
            .collect();

        self.post(
            "entities/insert",
            json!({ "collectionName": self.collection, "data": rows }),
        )
        .await?;

        // Flush before returning: an unflushed segment may be invisible
        // to a search issued right after the upload.
        self.post("collections/flush", json!({ "collectionName": self.collection }))
            .await?;

        tracing::debug!("Inserted {} chunks into Milvus", count);
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        source_file: Option<&str>,
    ) -> Result<Vec<SearchHit>, ApiError> {
        let mut body = json!({
            "collectionName": self.collection,
            "data": [vector],
            "annsField": "embedding",
            "limit": top_k,
            "outputFields": ["text", "source_file"],
            "searchParams": { "metricType": "COSINE", "params": { "nprobe": 10 } }
        });

        if let Some(source) = source_file {
            let escaped = source.replace('"', "\\\"");
            if let Some(obj) = body.as_object_mut() {
                obj.insert(
                    "filter".to_string(),
                    json!(format!("source_file == \"{escaped}\"")),
                );
            }
        }

        let payload = self.post("entities/search", body).await?;

        let hits = payload
            .get("data")
            .and_then(|v| v.as_array())
            .map(|rows| {
                rows.iter()
                    .map(|row| SearchHit {
                        text: row
                            .get("text")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        source_file: row
                            .get("source_file")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        score: row
                            .get("distance")
                            .and_then(|v| v.as_f64())
                            .unwrap_or(0.0) as f32,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(hits)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
