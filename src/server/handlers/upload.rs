use std::io::Write;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tempfile::NamedTempFile;

use crate::auth::session_token;
use crate::core::errors::ApiError;
use crate::state::AppState;

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Multipart PDF upload. The file is staged in a named temp file that
/// is removed on every exit path (drop), ingested into the document
/// store, and remembered as the session's active document.
pub async fn upload_pdf(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let token = session_token(&headers)?;
    state.sessions.get(&token).await?;

    // Bind by field name; the form may carry other parts before `file`.
    let field = loop {
        let next = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?;
        match next {
            Some(field) if field.name() == Some("file") => break field,
            Some(_) => continue,
            None => return Err(ApiError::BadRequest("Missing file field".to_string())),
        }
    };

    if field.content_type() != Some(PDF_CONTENT_TYPE) {
        return Err(ApiError::UnsupportedMediaType(
            "Only PDF files allowed.".to_string(),
        ));
    }

    let file_name = field
        .file_name()
        .unwrap_or("upload.pdf")
        .to_string();

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?;

    let mut tmp = NamedTempFile::new().map_err(ApiError::internal)?;
    tmp.write_all(&bytes).map_err(ApiError::internal)?;
    tmp.flush().map_err(ApiError::internal)?;

    let chunks = state.ingestor.ingest_pdf(tmp.path(), &file_name).await?;
    state.sessions.set_document(&token, &file_name).await?;

    tracing::info!(file = %file_name, chunks, "Upload ingested");
    Ok(Json(json!({ "status": "success", "filename": file_name })))
}
