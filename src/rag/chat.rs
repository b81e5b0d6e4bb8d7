//! Retrieval-augmented chat service.
//!
//! One chat turn: embed the question, fetch the most similar chunks,
//! assemble a prompt, call the generation backend. Backend failures do
//! not fail the turn; they come back as an in-band `"Error: ..."` reply
//! carrying a machine-readable kind so callers are not reduced to
//! string inspection.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::embed::EmbeddingBackend;
use crate::llm::GenerationBackend;
use crate::store::DocumentStore;

const SYSTEM_INSTRUCTION: &str = "You are a helpful AI assistant. Use the context to answer \
questions. If you don't know the answer, just say so. Do not hallucinate.";

/// Which stage of the chat turn failed, when one did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatErrorKind {
    Embedding,
    Retrieval,
    Generation,
}

/// Outcome of a chat turn. `error` is `None` for a real answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
    pub error: Option<ChatErrorKind>,
}

impl ChatReply {
    fn answer(text: String) -> Self {
        Self { text, error: None }
    }

    fn failure(kind: ChatErrorKind, err: &ApiError) -> Self {
        Self {
            text: format!("Error: {err}"),
            error: Some(kind),
        }
    }
}

pub struct ChatService {
    embedder: Arc<dyn EmbeddingBackend>,
    store: Arc<dyn DocumentStore>,
    llm: Arc<dyn GenerationBackend>,
    top_k: usize,
}

impl ChatService {
    pub fn new(
        embedder: Arc<dyn EmbeddingBackend>,
        store: Arc<dyn DocumentStore>,
        llm: Arc<dyn GenerationBackend>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
            top_k,
        }
    }

    /// Answer one question against the chunks of `scope_file`.
    ///
    /// Empty questions are rejected before any network call; everything
    /// downstream is swallowed into the reply per the in-band policy.
    pub async fn answer(
        &self,
        query: &str,
        scope_file: Option<&str>,
    ) -> Result<ChatReply, ApiError> {
        if query.trim().is_empty() {
            return Err(ApiError::BadRequest("Empty message".to_string()));
        }

        let query_embedding = match self.embedder.embed(&[query.to_string()]).await {
            Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
            Ok(_) => {
                let err = ApiError::Internal("embedding backend returned no vector".to_string());
                return Ok(ChatReply::failure(ChatErrorKind::Embedding, &err));
            }
            Err(err) => {
                tracing::warn!("Query embedding failed: {}", err);
                return Ok(ChatReply::failure(ChatErrorKind::Embedding, &err));
            }
        };

        let hits = match self
            .store
            .query(&query_embedding, self.top_k, scope_file)
            .await
        {
            Ok(hits) => hits,
            Err(err) => {
                tracing::warn!("Retrieval failed: {}", err);
                return Ok(ChatReply::failure(ChatErrorKind::Retrieval, &err));
            }
        };

        let context = hits
            .iter()
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "{SYSTEM_INSTRUCTION}\n\nContext:\n{context}\n\nUser: {query}"
        );

        match self.llm.generate(&prompt).await {
            Ok(text) => Ok(ChatReply::answer(text)),
            Err(err) => {
                tracing::warn!("Generation failed: {}", err);
                Ok(ChatReply::failure(ChatErrorKind::Generation, &err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::store::{EmbeddedChunk, SearchHit};

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingBackend for FixedEmbedder {
        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingBackend for FailingEmbedder {
        async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Err(ApiError::Internal("embedding backend down".to_string()))
        }
    }

    struct FixedStore {
        hits: Vec<SearchHit>,
    }

    #[async_trait]
    impl DocumentStore for FixedStore {
        async fn upsert(&self, _chunks: Vec<EmbeddedChunk>) -> Result<(), ApiError> {
            Ok(())
        }

        async fn query(
            &self,
            _vector: &[f32],
            _top_k: usize,
            _source_file: Option<&str>,
        ) -> Result<Vec<SearchHit>, ApiError> {
            Ok(self.hits.clone())
        }
    }

    struct EchoLlm {
        calls: AtomicUsize,
    }

    impl EchoLlm {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for EchoLlm {
        async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(prompt.to_string())
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl GenerationBackend for FailingLlm {
        async fn generate(&self, _prompt: &str) -> Result<String, ApiError> {
            Err(ApiError::Internal("model overloaded".to_string()))
        }
    }

    fn hit(text: &str) -> SearchHit {
        SearchHit {
            text: text.to_string(),
            source_file: "doc.pdf".to_string(),
            score: 0.9,
        }
    }

    #[tokio::test]
    async fn empty_message_rejected_before_any_call() {
        let llm = Arc::new(EchoLlm::new());
        let service = ChatService::new(
            Arc::new(FailingEmbedder),
            Arc::new(FixedStore { hits: vec![] }),
            llm.clone(),
            3,
        );

        let result = service.answer("   \n\t ", Some("doc.pdf")).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn prompt_contains_context_in_store_order_and_raw_query() {
        let llm = Arc::new(EchoLlm::new());
        let service = ChatService::new(
            Arc::new(FixedEmbedder),
            Arc::new(FixedStore {
                hits: vec![hit("first chunk"), hit("second chunk")],
            }),
            llm,
            3,
        );

        let reply = service.answer("what is this?", Some("doc.pdf")).await.unwrap();
        assert!(reply.error.is_none());
        let first = reply.text.find("first chunk").unwrap();
        let second = reply.text.find("second chunk").unwrap();
        assert!(first < second);
        assert!(reply.text.contains("first chunk\n\nsecond chunk"));
        assert!(reply.text.ends_with("User: what is this?"));
    }

    #[tokio::test]
    async fn embedding_failure_is_swallowed_with_kind() {
        let service = ChatService::new(
            Arc::new(FailingEmbedder),
            Arc::new(FixedStore { hits: vec![] }),
            Arc::new(EchoLlm::new()),
            3,
        );

        let reply = service.answer("hello", None).await.unwrap();
        assert!(reply.text.starts_with("Error: "));
        assert_eq!(reply.error, Some(ChatErrorKind::Embedding));
    }

    #[tokio::test]
    async fn generation_failure_is_swallowed_with_kind() {
        let service = ChatService::new(
            Arc::new(FixedEmbedder),
            Arc::new(FixedStore {
                hits: vec![hit("ctx")],
            }),
            Arc::new(FailingLlm),
            3,
        );

        let reply = service.answer("hello", None).await.unwrap();
        assert!(reply.text.starts_with("Error: "));
        assert_eq!(reply.error, Some(ChatErrorKind::Generation));
    }

    #[tokio::test]
    async fn empty_index_still_answers() {
        let service = ChatService::new(
            Arc::new(FixedEmbedder),
            Arc::new(FixedStore { hits: vec![] }),
            Arc::new(EchoLlm::new()),
            3,
        );

        let reply = service.answer("anything there?", None).await.unwrap();
        assert!(reply.error.is_none());
        assert!(reply.text.contains("Context:\n\n"));
    }
}
