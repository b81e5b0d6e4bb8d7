use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::session_token;
use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// One chat turn against the session's uploaded document. Requires a
/// valid session cookie and a prior successful upload; retrieval is
/// scoped to that document.
pub async fn chat_with_pdf(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = session_token(&headers)?;
    let session = state.sessions.get(&token).await?;

    let file_name = session
        .file_name
        .ok_or_else(|| ApiError::BadRequest("No file uploaded yet.".to_string()))?;

    let reply = state
        .chat
        .answer(&payload.message, Some(file_name.as_str()))
        .await?;

    let body = match reply.error {
        Some(kind) => json!({ "response": reply.text, "error": kind }),
        None => json!({ "response": reply.text }),
    };

    Ok(Json(body))
}
