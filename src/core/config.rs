use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::errors::ApiError;

/// Filesystem locations for mutable state (logs, embedded store).
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub store_db_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let data_dir = discover_data_dir();
        let log_dir = data_dir.join("logs");
        let store_db_path = data_dir.join("chunks.db");

        for dir in [&data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            data_dir,
            log_dir,
            store_db_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("DOCCHAT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(debug_assertions) {
        return env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    if cfg!(target_os = "windows") {
        let base = env::var("LOCALAPPDATA")
            .unwrap_or_else(|_| env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string()));
        return PathBuf::from(base).join("Docchat");
    }

    if cfg!(target_os = "macos") {
        return home_dir()
            .join("Library")
            .join("Application Support")
            .join("Docchat");
    }

    let xdg = env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
        home_dir()
            .join(".local/share")
            .to_string_lossy()
            .to_string()
    });
    PathBuf::from(xdg).join("docchat")
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Which vector store backs the document index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Milvus,
}

/// Environment-driven application configuration.
///
/// Credentials for the identity provider, the vector store and the
/// generation backend all come from the environment; nothing is read
/// from config files.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,

    pub store_backend: StoreBackend,
    pub milvus_uri: Option<String>,
    pub milvus_token: Option<String>,
    pub collection_name: String,

    pub gemini_api_key: Option<String>,
    pub gemini_model: String,

    pub embedding_base_url: String,
    pub embedding_model: String,
    pub embedding_dim: usize,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,

    /// Bound on every outbound HTTP call. The original system ran with
    /// no timeouts at all; here each client is built with this budget.
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ApiError> {
        let store_backend = match env::var("DOCCHAT_STORE").as_deref() {
            Ok("milvus") => StoreBackend::Milvus,
            Ok("sqlite") | Err(_) => StoreBackend::Sqlite,
            Ok(other) => {
                return Err(ApiError::Configuration(format!(
                    "unknown DOCCHAT_STORE backend: {other}"
                )))
            }
        };

        let config = AppConfig {
            google_client_id: env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            google_redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:8000/auth/google/callback".to_string()),
            store_backend,
            milvus_uri: env::var("MILVUS_URI").ok(),
            milvus_token: env::var("MILVUS_TOKEN").ok(),
            collection_name: env::var("DOCCHAT_COLLECTION")
                .unwrap_or_else(|_| "pdf_chunks".to_string()),
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            embedding_base_url: env::var("EMBEDDING_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8090".to_string()),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "all-MiniLM-L6-v2".to_string()),
            embedding_dim: env_usize("DOCCHAT_EMBEDDING_DIM", 384),
            chunk_size: env_usize("DOCCHAT_CHUNK_SIZE", 500),
            chunk_overlap: env_usize("DOCCHAT_CHUNK_OVERLAP", 100),
            top_k: env_usize("DOCCHAT_TOP_K", 3),
            http_timeout: Duration::from_secs(env_usize("DOCCHAT_HTTP_TIMEOUT_SECS", 30) as u64),
        };

        if config.chunk_size <= config.chunk_overlap {
            return Err(ApiError::Configuration(format!(
                "chunk_size ({}) must be greater than chunk_overlap ({})",
                config.chunk_size, config.chunk_overlap
            )));
        }

        if config.store_backend == StoreBackend::Milvus && config.milvus_uri.is_none() {
            return Err(ApiError::Configuration(
                "MILVUS_URI is required when DOCCHAT_STORE=milvus".to_string(),
            ));
        }

        Ok(config)
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}
