use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds();
    Json(json!({ "status": "ok", "uptime_secs": uptime_secs }))
}

pub async fn index() -> impl IntoResponse {
    Html(include_str!("../../../static/index.html"))
}

pub async fn app_js() -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "application/javascript")],
        include_str!("../../../static/app.js"),
    )
}
