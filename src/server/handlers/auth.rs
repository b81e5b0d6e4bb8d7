use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{AppendHeaders, IntoResponse, Redirect};

use crate::auth::session_cookie;
use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn login(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Redirect::temporary(&state.oauth.authorize_url())
}

/// OAuth callback: exchange the code, resolve the account email, create
/// a session keyed by the access token and hand the token back as an
/// HTTP-only cookie.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let code = params
        .get("code")
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing code".to_string()))?;

    let access_token = state.oauth.exchange_code(code).await?;
    let email = state.oauth.fetch_email(&access_token).await?;

    state.sessions.create(&access_token, &email).await?;
    tracing::info!(email = %email, "Authenticated session created");

    Ok((
        AppendHeaders([(header::SET_COOKIE, session_cookie(&access_token))]),
        Redirect::to("/"),
    ))
}
