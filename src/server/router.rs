use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{auth, chat, health, upload};
use crate::state::AppState;

/// Builds the application router: static UI, OAuth endpoints, upload
/// and chat, with CORS and request tracing layered on top.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health::index))
        .route("/static/app.js", get(health::app_js))
        .route("/health", get(health::health))
        .route("/auth/login", get(auth::login))
        .route("/auth/google/callback", get(auth::callback))
        .route("/upload", post(upload::upload_pdf))
        .route("/chat", post(chat::chat_with_pdf))
        .with_state(state)
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}
