//! Session store — maps the opaque bearer token issued at login to the
//! user's identity and their most recently ingested document.
//!
//! The trait exists so the in-memory map can be swapped for an external
//! cache in multi-process deployments without touching the handlers.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub email: String,
    /// Display name of the last successful upload. Chat is refused
    /// while this is `None`.
    pub file_name: Option<String>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Register a fresh session for the given token. Re-registering the
    /// same token replaces the previous session (last write wins).
    async fn create(&self, token: &str, email: &str) -> Result<Session, ApiError>;

    /// Look up the session for a token; unknown tokens are unauthorized.
    async fn get(&self, token: &str) -> Result<Session, ApiError>;

    /// Remember the most recently ingested document for a session.
    async fn set_document(&self, token: &str, file_name: &str) -> Result<(), ApiError>;
}

/// Single-process implementation backed by a concurrent map. Writers to
/// distinct tokens never block each other; sessions live until restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, token: &str, email: &str) -> Result<Session, ApiError> {
        let session = Session {
            email: email.to_string(),
            file_name: None,
        };
        self.sessions.insert(token.to_string(), session.clone());
        Ok(session)
    }

    async fn get(&self, token: &str) -> Result<Session, ApiError> {
        self.sessions
            .get(token)
            .map(|entry| entry.value().clone())
            .ok_or(ApiError::Unauthorized)
    }

    async fn set_document(&self, token: &str, file_name: &str) -> Result<(), ApiError> {
        let mut entry = self.sessions.get_mut(token).ok_or(ApiError::Unauthorized)?;
        entry.file_name = Some(file_name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get() {
        let store = InMemorySessionStore::new();
        store.create("tok", "user@example.com").await.unwrap();

        let session = store.get("tok").await.unwrap();
        assert_eq!(session.email, "user@example.com");
        assert!(session.file_name.is_none());
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let store = InMemorySessionStore::new();
        let result = store.get("missing").await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn set_document_replaces_previous() {
        let store = InMemorySessionStore::new();
        store.create("tok", "user@example.com").await.unwrap();

        store.set_document("tok", "first.pdf").await.unwrap();
        store.set_document("tok", "second.pdf").await.unwrap();

        let session = store.get("tok").await.unwrap();
        assert_eq!(session.file_name.as_deref(), Some("second.pdf"));
    }

    #[tokio::test]
    async fn set_document_for_unknown_token_fails() {
        let store = InMemorySessionStore::new();
        let result = store.set_document("missing", "a.pdf").await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }
}
