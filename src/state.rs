use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::auth::GoogleOAuth;
use crate::core::config::{AppConfig, AppPaths, StoreBackend};
use crate::core::errors::ApiError;
use crate::embed::{EmbeddingBackend, HttpEmbeddingBackend};
use crate::llm::{GeminiProvider, GenerationBackend};
use crate::rag::{ChatService, ChunkerConfig, DocumentIngestor};
use crate::session::{InMemorySessionStore, SessionStore};
use crate::store::{DocumentStore, MilvusDocStore, SqliteDocStore};

pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: AppConfig,
    pub oauth: GoogleOAuth,
    pub sessions: Arc<dyn SessionStore>,
    pub ingestor: DocumentIngestor,
    pub chat: ChatService,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, ApiError> {
        let config = AppConfig::from_env()?;

        let store: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Sqlite => Arc::new(SqliteDocStore::new(&paths).await?),
            StoreBackend::Milvus => Arc::new(MilvusDocStore::connect(&config).await?),
        };

        let embedder: Arc<dyn EmbeddingBackend> = Arc::new(HttpEmbeddingBackend::new(&config)?);
        let llm: Arc<dyn GenerationBackend> = Arc::new(GeminiProvider::new(&config)?);
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());

        Ok(Self::assemble(paths, config, store, embedder, llm, sessions)?)
    }

    /// Wire the state from explicit components. Exposed so tests can
    /// stand up the router against fake backends.
    pub fn assemble(
        paths: Arc<AppPaths>,
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingBackend>,
        llm: Arc<dyn GenerationBackend>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Arc<Self>, ApiError> {
        let chunker = ChunkerConfig::from_app_config(&config)?;
        let oauth = GoogleOAuth::new(&config)?;

        let ingestor = DocumentIngestor::new(
            chunker,
            config.embedding_dim,
            embedder.clone(),
            store.clone(),
        );
        let chat = ChatService::new(embedder, store, llm, config.top_k);

        Ok(Arc::new(AppState {
            paths,
            config,
            oauth,
            sessions,
            ingestor,
            chat,
            started_at: Utc::now(),
        }))
    }
}
